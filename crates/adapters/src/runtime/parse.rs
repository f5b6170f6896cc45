// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsing of `docker ... --format '{{json .}}'` output.

use super::{ContainerSummary, ImageSummary, PortMapping, RuntimeError};
use serde::Deserialize;

#[derive(Deserialize)]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names", default)]
    names: String,
    #[serde(rename = "Image", default)]
    image: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "Ports", default)]
    ports: String,
    #[serde(rename = "Labels", default)]
    labels: String,
}

#[derive(Deserialize)]
struct ImageLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Repository", default)]
    repository: String,
    #[serde(rename = "Tag", default)]
    tag: String,
}

/// Parse `docker ps --format '{{json .}}'` output, one object per line.
pub(super) fn parse_ps(stdout: &str) -> Result<Vec<ContainerSummary>, RuntimeError> {
    json_lines(stdout)
        .map(|line| {
            let ps: PsLine = serde_json::from_str(line)
                .map_err(|e| RuntimeError::Parse(format!("container list: {e}")))?;
            Ok(ContainerSummary {
                id: ps.id,
                // Containers may carry several comma-separated names.
                name: ps.names.split(',').next().unwrap_or_default().to_string(),
                image: ps.image,
                state: ps.state,
                status: ps.status,
                ports: parse_ports(&ps.ports),
                labels: parse_labels(&ps.labels),
            })
        })
        .collect()
}

/// Parse `docker images --format '{{json .}}'` output.
pub(super) fn parse_images(stdout: &str) -> Result<Vec<ImageSummary>, RuntimeError> {
    json_lines(stdout)
        .map(|line| {
            let img: ImageLine = serde_json::from_str(line)
                .map_err(|e| RuntimeError::Parse(format!("image list: {e}")))?;
            Ok(ImageSummary {
                id: img.id,
                reference: format!("{}:{}", img.repository, img.tag),
            })
        })
        .collect()
}

/// Parse a ports column such as `0.0.0.0:49153->6443/tcp, :::49153->6443/tcp`.
///
/// Unpublished ports (`6443/tcp`) get host port 0. Port ranges are skipped.
pub(super) fn parse_ports(raw: &str) -> Vec<PortMapping> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(parse_port)
        .collect()
}

fn parse_port(entry: &str) -> Option<PortMapping> {
    let (host, container) = match entry.split_once("->") {
        Some((host, container)) => (Some(host), container),
        None => (None, entry),
    };
    let (container_port, protocol) = container.split_once('/').unwrap_or((container, "tcp"));
    let container_port = container_port.parse().ok()?;

    let (host_ip, host_port) = match host {
        Some(host) => {
            let (ip, port) = host.rsplit_once(':')?;
            (ip.to_string(), port.parse().ok()?)
        }
        None => (String::new(), 0),
    };

    Some(PortMapping {
        host_ip,
        host_port,
        container_port,
        protocol: protocol.to_string(),
    })
}

/// Parse a labels column such as `a=b,c=d`.
pub(super) fn parse_labels(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter(|s| !s.is_empty())
        .map(|kv| match kv.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (kv.to_string(), String::new()),
        })
        .collect()
}

fn json_lines(stdout: &str) -> impl Iterator<Item = &str> {
    stdout.lines().map(str::trim).filter(|l| !l.is_empty())
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
