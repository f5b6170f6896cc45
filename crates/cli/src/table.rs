// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aligned text tables for `sim` list views.
//!
//! Widths are measured in chars so display names with non-ASCII text
//! line up and truncate on a char boundary.

use std::io::Write;

use crate::color;

pub enum Align {
    Left,
    Right,
}

/// Styling applied to a cell once it has been padded.
pub enum CellStyle {
    Plain,
    Muted,
    /// Colored by [`color::apply_status`] according to the cell's word.
    Status,
}

pub struct Column {
    pub name: &'static str,
    pub align: Align,
    pub style: CellStyle,
    pub min_width: Option<usize>,
    /// Longer values are cut to this many chars.
    pub max_width: Option<usize>,
}

impl Column {
    fn new(name: &'static str, align: Align, style: CellStyle) -> Self {
        Self {
            name,
            align,
            style,
            min_width: None,
            max_width: None,
        }
    }

    pub fn left(name: &'static str) -> Self {
        Self::new(name, Align::Left, CellStyle::Plain)
    }

    pub fn right(name: &'static str) -> Self {
        Self::new(name, Align::Right, CellStyle::Plain)
    }

    pub fn muted(name: &'static str) -> Self {
        Self::new(name, Align::Left, CellStyle::Muted)
    }

    pub fn status(name: &'static str) -> Self {
        Self::new(name, Align::Left, CellStyle::Status)
    }

    pub fn with_max(mut self, max: usize) -> Self {
        self.max_width = Some(max);
        self
    }

    fn clip<'a>(&self, text: &'a str) -> &'a str {
        match self.max_width {
            Some(max) => text
                .char_indices()
                .nth(max)
                .map_or(text, |(cut, _)| &text[..cut]),
            None => text,
        }
    }
}

pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
    colorize: bool,
}

const SEP: &str = "  ";

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self::with_color(columns, color::should_colorize())
    }

    #[cfg(test)]
    pub fn plain(columns: Vec<Column>) -> Self {
        Self::with_color(columns, false)
    }

    #[cfg(test)]
    pub fn colored(columns: Vec<Column>) -> Self {
        Self::with_color(columns, true)
    }

    fn with_color(columns: Vec<Column>, colorize: bool) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            colorize,
        }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    /// Write the header and every row. An empty table writes nothing.
    ///
    /// A trailing left-aligned column is left unpadded. Color goes on after
    /// padding so escape codes never count toward widths.
    pub fn render(&self, out: &mut impl Write) {
        if self.rows.is_empty() {
            return;
        }
        let widths = self.widths();

        let header: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let text = self.fit(i, col.name, widths[i]);
                if self.colorize {
                    color::apply_header(&text)
                } else {
                    text
                }
            })
            .collect();
        let _ = writeln!(out, "{}", header.join(SEP));

        for row in &self.rows {
            let cells: Vec<String> = self
                .columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let raw = row.get(i).map_or("", String::as_str);
                    let text = self.fit(i, col.clip(raw), widths[i]);
                    self.style(&col.style, text)
                })
                .collect();
            let _ = writeln!(out, "{}", cells.join(SEP));
        }
    }

    fn fit(&self, index: usize, text: &str, width: usize) -> String {
        let col = &self.columns[index];
        let last = index + 1 == self.columns.len();
        match col.align {
            Align::Left if last => text.to_string(),
            Align::Left => format!("{text:<width$}"),
            Align::Right => format!("{text:>width$}"),
        }
    }

    fn style(&self, style: &CellStyle, text: String) -> String {
        if !self.colorize {
            return text;
        }
        match style {
            CellStyle::Plain => text,
            CellStyle::Muted => color::apply_muted(&text),
            CellStyle::Status => color::apply_status(&text),
        }
    }

    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let widest = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| col.clip(cell).chars().count())
                    .max()
                    .unwrap_or(0);
                col.min_width
                    .unwrap_or(col.name.chars().count())
                    .max(widest)
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
