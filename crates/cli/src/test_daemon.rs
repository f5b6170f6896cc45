// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted stand-in for `simd` used by command tests.

use std::path::Path;
use std::sync::{Arc, Mutex};

use sim_daemon::protocol;
use sim_daemon::{Request, Response};
use tokio::net::UnixListener;

use crate::client::DaemonClient;

/// Answers one request per connection with the next scripted reply and
/// records every request it saw.
pub struct FakeDaemon {
    pub client: DaemonClient,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl FakeDaemon {
    pub fn spawn(dir: &Path, replies: Vec<Response>) -> Self {
        let socket_path = dir.join("daemon.sock");
        let listener = UnixListener::bind(&socket_path).unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        tokio::spawn(async move {
            for reply in replies {
                let (stream, _) = listener.accept().await.unwrap();
                let (mut reader, mut writer) = stream.into_split();
                let bytes = protocol::read_message(&mut reader).await.unwrap();
                seen.lock()
                    .unwrap()
                    .push(protocol::decode(&bytes).unwrap());
                let data = protocol::encode(&reply).unwrap();
                protocol::write_message(&mut writer, &data).await.unwrap();
            }
        });

        Self {
            client: DaemonClient::at(socket_path),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}
