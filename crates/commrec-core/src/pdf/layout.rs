//! Positioned text collection and table reconstruction.
//!
//! Statement columns are usually separate text objects placed at different x
//! positions. Plain text extraction joins them with a single space, so tables
//! are rebuilt here from where each glyph run lands on the page:
//!
//! - glyphs shown by one text operator form a run;
//! - runs sharing a baseline form a line;
//! - runs on a line closer than [`CELL_GAP`] font sizes merge into one cell;
//! - consecutive lines with two or more cells form a table, and data cells
//!   are placed under the header cell they overlap most.

use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};

use super::RawTable;
use crate::extract::rules::patterns::CELL_SEPARATOR;

/// Horizontal gap, in font sizes, that separates two cells.
const CELL_GAP: f64 = 1.0;

/// Horizontal gap, in font sizes, rendered as a space inside a cell.
const WORD_GAP: f64 = 0.1;

/// Baseline distance, in font sizes, within which runs share a line.
const LINE_TOLERANCE: f64 = 0.5;

/// Baseline distance, in font sizes, past which a table ends.
const ROW_GAP: f64 = 2.5;

/// A run of glyphs drawn by one text operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x0: f64,
    pub x1: f64,
    /// Baseline, measured down from the top of the page.
    pub y: f64,
    /// Rendered font size.
    pub size: f64,
    pub text: String,
}

/// Positioned text of one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    /// Page number (1-indexed).
    pub number: u32,
    pub runs: Vec<TextRun>,
}

#[derive(Debug, Clone, PartialEq)]
struct Cell {
    x0: f64,
    x1: f64,
    text: String,
}

#[derive(Debug)]
struct Line {
    y: f64,
    size: f64,
    cells: Vec<Cell>,
}

impl PageLayout {
    pub fn new(number: u32, runs: Vec<TextRun>) -> Self {
        Self { number, runs }
    }

    /// Tables on the page. Row 0 of each is its header.
    pub fn tables(&self) -> Vec<RawTable> {
        let mut tables = Vec::new();
        let mut block: Vec<Line> = Vec::new();

        for line in self.lines() {
            if line.cells.len() < 2 {
                flush(&mut block, &mut tables);
                continue;
            }

            let detached = block
                .last()
                .is_some_and(|prev| line.y - prev.y > prev.size.max(line.size) * ROW_GAP);
            if detached {
                flush(&mut block, &mut tables);
            }
            block.push(line);
        }
        flush(&mut block, &mut tables);

        tables
    }

    /// Runs grouped by baseline, top to bottom, each split into cells.
    fn lines(&self) -> Vec<Line> {
        let mut runs: Vec<&TextRun> = self.runs.iter().collect();
        runs.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x0.total_cmp(&b.x0)));

        let mut grouped: Vec<(f64, f64, Vec<&TextRun>)> = Vec::new();
        for run in runs {
            match grouped.last_mut() {
                Some((y, size, members)) if (run.y - *y).abs() <= size.max(run.size) * LINE_TOLERANCE => {
                    *size = size.max(run.size);
                    members.push(run);
                }
                _ => grouped.push((run.y, run.size, vec![run])),
            }
        }

        grouped
            .into_iter()
            .map(|(y, size, mut members)| {
                members.sort_by(|a, b| a.x0.total_cmp(&b.x0));
                Line { y, size, cells: line_cells(&members) }
            })
            .collect()
    }
}

/// Merge close runs into cells, then split cells on wide in-text spacing.
fn line_cells(runs: &[&TextRun]) -> Vec<Cell> {
    let mut merged: Vec<Cell> = Vec::new();

    for run in runs {
        match merged.last_mut() {
            Some(cell) if run.x0 - cell.x1 <= run.size * CELL_GAP => {
                if run.x0 - cell.x1 > run.size * WORD_GAP {
                    cell.text.push(' ');
                }
                cell.text.push_str(&run.text);
                cell.x1 = cell.x1.max(run.x1);
            }
            _ => merged.push(Cell {
                x0: run.x0,
                x1: run.x1,
                text: run.text.clone(),
            }),
        }
    }

    merged.iter().flat_map(split_cell).collect()
}

/// Split a cell whose text carries column gaps as spaces or tabs. Positions
/// of the pieces are interpolated by character offset.
fn split_cell(cell: &Cell) -> Vec<Cell> {
    let text = cell.text.as_str();
    let per_char = (cell.x1 - cell.x0) / text.chars().count().max(1) as f64;
    let x_at = |byte: usize| cell.x0 + per_char * text[..byte].chars().count() as f64;

    let mut bounds = Vec::new();
    let mut start = 0;
    for separator in CELL_SEPARATOR.find_iter(text) {
        bounds.push((start, separator.start()));
        start = separator.end();
    }
    bounds.push((start, text.len()));

    bounds
        .into_iter()
        .filter_map(|(from, to)| {
            let piece = text[from..to].trim();
            (!piece.is_empty()).then(|| Cell {
                x0: x_at(from),
                x1: x_at(to),
                text: piece.to_string(),
            })
        })
        .collect()
}

fn flush(block: &mut Vec<Line>, tables: &mut Vec<RawTable>) {
    let lines = std::mem::take(block);
    // A header without data rows is not a table
    if lines.len() >= 2 {
        tables.push(align_columns(&lines));
    }
}

/// Lay data cells out under the header columns.
fn align_columns(lines: &[Line]) -> RawTable {
    let Some((header, body)) = lines.split_first() else {
        return RawTable::default();
    };
    let columns = &header.cells;

    let mut rows = vec![columns.iter().map(|c| c.text.clone()).collect::<Vec<_>>()];
    for line in body {
        let mut row = vec![String::new(); columns.len()];
        for cell in &line.cells {
            let slot = &mut row[column_for(columns, cell)];
            if !slot.is_empty() {
                slot.push(' ');
            }
            slot.push_str(&cell.text);
        }
        rows.push(row);
    }

    RawTable::new(rows)
}

/// Header column with the largest horizontal overlap. Without overlap the
/// smallest gap wins, which is the same measure negated.
fn column_for(columns: &[Cell], cell: &Cell) -> usize {
    let overlap = |c: &Cell| cell.x1.min(c.x1) - cell.x0.max(c.x0);

    columns
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| overlap(a).total_cmp(&overlap(b)))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Collects positioned glyph runs from `pdf_extract`.
#[derive(Debug, Default)]
pub struct LayoutCollector {
    pages: Vec<PageLayout>,
    page: Option<PageLayout>,
    run: Option<TextRun>,
    page_left: f64,
    page_top: f64,
}

impl LayoutCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collected pages, in the order they were rendered.
    pub fn into_pages(mut self) -> Vec<PageLayout> {
        self.finish_page();
        self.pages
    }

    fn flush_run(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };
        if run.text.trim().is_empty() {
            return;
        }
        if let Some(page) = self.page.as_mut() {
            page.runs.push(run);
        }
    }

    fn finish_page(&mut self) {
        self.flush_run();
        if let Some(page) = self.page.take() {
            self.pages.push(page);
        }
    }
}

/// Font size after the text rendering matrix is applied.
fn rendered_size(trm: &Transform, font_size: f64) -> f64 {
    let sx = font_size * (trm.m11 + trm.m21);
    let sy = font_size * (trm.m12 + trm.m22);
    let size = (sx * sy).abs().sqrt();
    if size.is_normal() { size } else { font_size.abs().max(1.0) }
}

impl OutputDev for LayoutCollector {
    fn begin_page(
        &mut self,
        page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.finish_page();
        self.page_left = media_box.llx;
        self.page_top = media_box.ury;
        self.page = Some(PageLayout::new(page_num, Vec::new()));
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        self.finish_page();
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> Result<(), OutputError> {
        let size = rendered_size(trm, font_size);
        let x = trm.m31 - self.page_left;
        let y = self.page_top - trm.m32;

        // Moving back, off the baseline or across a wide gap starts a new run
        let detached = self.run.as_ref().is_none_or(|run| {
            (y - run.y).abs() > size * LINE_TOLERANCE || x < run.x0 || x - run.x1 > size * CELL_GAP
        });
        if detached {
            self.flush_run();
            self.run = Some(TextRun {
                x0: x,
                x1: x,
                y,
                size,
                text: String::new(),
            });
        }

        if let Some(run) = self.run.as_mut() {
            if !run.text.is_empty() && x - run.x1 > size * WORD_GAP {
                run.text.push(' ');
            }
            run.text.push_str(char);
            run.x1 = run.x1.max(x + width * size);
        }
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        self.flush_run();
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}
