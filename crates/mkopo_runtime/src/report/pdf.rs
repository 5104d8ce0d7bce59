use super::{NO_DATA, Cell, ReportKind, ReportTable};
use crate::errors::ReportError;
use chrono::NaiveDate;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use mkopo_common::time::fmt_ymd;

const PAGE_WIDTH: f64 = 612.0;
const PAGE_HEIGHT: f64 = 792.0;
const MARGIN: f64 = 50.0;
const TABLE_WIDTH: f64 = 500.0;
const ROW_HEIGHT: f64 = 16.0;
const BODY_SIZE: f64 = 10.0;
// Cursor below this starts a new page.
const BOTTOM_THRESHOLD: f64 = 92.0;
// Rough average glyph width factor for Helvetica.
const GLYPH_WIDTH: f64 = 0.55;

fn is_currency_column(header: &str) -> bool {
    header.contains("Amount") || header.contains("Interest")
}

/// `12345.5` -> `12,345.50`; whole amounts drop the fraction. Rounded to
/// cents before splitting so carry propagates into the whole part.
fn group_thousands(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as i64;
    let whole = cents / 100;
    let fraction = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if fraction > 0 {
        out.push_str(&format!(".{:02}", fraction));
    }
    out
}

fn render_cell(cell: &Cell, currency: bool) -> String {
    match cell {
        Cell::Money(v) if currency => format!("KES {}", group_thousands(*v)),
        Cell::Count(n) if currency => format!("KES {}", group_thousands(*n as f64)),
        other => other.render(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars.saturating_sub(1)).chain(std::iter::once('…')).collect()
}

fn text_op(ops: &mut Vec<Operation>, font: &str, size: f64, x: f64, y: f64, text: &str) {
    // Whole-point coordinates keep the operand stream to plain integers.
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.into(), (size.round() as i64).into()]));
    ops.push(Operation::new(
        "Td",
        vec![(x.round() as i64).into(), (y.round() as i64).into()],
    ));
    ops.push(Operation::new("Tj", vec![Object::string_literal(text)]));
    ops.push(Operation::new("ET", vec![]));
}

fn centered(ops: &mut Vec<Operation>, font: &str, size: f64, y: f64, text: &str) {
    let width = text.chars().count() as f64 * size * GLYPH_WIDTH;
    let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN);
    text_op(ops, font, size, x, y, text);
}

/// Render the table as a paginated single-table PDF: centered title and
/// period line, bold header row, equal-width columns, currency columns
/// prefixed with KES, page break past the bottom threshold.
pub fn encode(
    table: &ReportTable,
    kind: ReportKind,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<u8>, ReportError> {
    let mut pages: Vec<Vec<Operation>> = vec![];
    let mut ops: Vec<Operation> = vec![];
    let mut y = PAGE_HEIGHT - 72.0;

    centered(&mut ops, "F2", 20.0, y, kind.title());
    y -= 2.0 * ROW_HEIGHT;
    centered(
        &mut ops,
        "F1",
        12.0,
        y,
        &format!("Period: {} to {}", fmt_ymd(from), fmt_ymd(to)),
    );
    y -= 2.5 * ROW_HEIGHT;

    if table.is_empty() {
        centered(&mut ops, "F1", 12.0, y, NO_DATA);
    } else {
        let column_count = table.columns.len().max(1);
        let column_width = TABLE_WIDTH / column_count as f64;
        let max_chars = ((column_width / (BODY_SIZE * GLYPH_WIDTH)) as usize).max(3);
        let currency: Vec<bool> = table.columns.iter().map(|c| is_currency_column(c)).collect();

        for (i, header) in table.columns.iter().enumerate() {
            let x = MARGIN + i as f64 * column_width;
            text_op(&mut ops, "F2", BODY_SIZE, x, y, &truncate(header, max_chars));
        }
        y -= ROW_HEIGHT;

        for row in &table.rows {
            for (i, cell) in row.iter().enumerate() {
                let x = MARGIN + i as f64 * column_width;
                let value = render_cell(cell, currency.get(i).copied().unwrap_or(false));
                text_op(&mut ops, "F1", BODY_SIZE, x, y, &truncate(&value, max_chars));
            }
            y -= ROW_HEIGHT;

            if y < BOTTOM_THRESHOLD {
                pages.push(std::mem::take(&mut ops));
                y = PAGE_HEIGHT - 72.0;
            }
        }
    }
    if !ops.is_empty() {
        pages.push(ops);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    let page_count = pages.len();
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), (PAGE_WIDTH as i64).into(), (PAGE_HEIGHT as i64).into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
