use crate::error::Result;
use crate::report::format::{
    BAND_FILL, HEADER_FILL, HEADER_FONT, NUMBER_FORMAT, PERCENT_FORMAT, TOTAL_FILL,
};
use crate::report::table::{Cell, ReportTable};
use log::info;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook};
use std::collections::HashSet;

const MAX_SHEET_NAME: usize = 31;

struct SheetFormats {
    header: Format,
    label: Format,
    number: Format,
    percent: Format,
    band_label: Format,
    band_number: Format,
    band_percent: Format,
    total_label: Format,
    total_number: Format,
    total_percent: Format,
}

impl SheetFormats {
    fn new() -> Self {
        let base = Format::new().set_border(FormatBorder::Thin);
        let band = base.clone().set_background_color(Color::RGB(BAND_FILL));
        let total = base
            .clone()
            .set_bold()
            .set_background_color(Color::RGB(TOTAL_FILL));

        Self {
            header: base
                .clone()
                .set_bold()
                .set_font_color(Color::RGB(HEADER_FONT))
                .set_background_color(Color::RGB(HEADER_FILL)),
            label: base.clone(),
            number: base.clone().set_num_format(NUMBER_FORMAT),
            percent: base.clone().set_num_format(PERCENT_FORMAT),
            band_label: band.clone(),
            band_number: band.clone().set_num_format(NUMBER_FORMAT),
            band_percent: band.set_num_format(PERCENT_FORMAT),
            total_label: total.clone(),
            total_number: total.clone().set_num_format(NUMBER_FORMAT),
            total_percent: total.set_num_format(PERCENT_FORMAT),
        }
    }
}

fn trim_name(name: &str) -> &str {
    name.trim().trim_matches('\'').trim()
}

/// Excel sheet names: at most 31 characters, none of `[]:*?/\`, no leading
/// or trailing apostrophe, not the reserved "History", unique within the
/// workbook (case-insensitive).
pub fn sheet_name(title: &str, taken: &mut HashSet<String>) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .collect();
    let truncated: String = trim_name(&cleaned).chars().take(MAX_SHEET_NAME).collect();
    let base = match trim_name(&truncated) {
        "" => "Sheet".to_string(),
        name if name.eq_ignore_ascii_case("history") => format!("{} Table", name),
        name => name.to_string(),
    };

    let mut candidate = base.clone();
    let mut n = 2;
    while taken.contains(&candidate.to_lowercase()) {
        let suffix = format!(" ({})", n);
        let keep = MAX_SHEET_NAME - suffix.chars().count();
        let head: String = base.chars().take(keep).collect();
        candidate = format!("{}{}", trim_name(&head), suffix);
        n += 1;
    }
    taken.insert(candidate.to_lowercase());
    candidate
}

/// One sheet per table: header row first, index column leftmost.
pub fn write_workbook(tables: &[ReportTable]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let formats = SheetFormats::new();
    let mut taken = HashSet::new();

    for table in tables {
        let name = sheet_name(&table.title, &mut taken);
        let sheet = workbook.add_worksheet();
        sheet.set_name(&name)?;

        sheet.write_string_with_format(0, 0, &table.index_header, &formats.header)?;
        for (idx, column) in table.columns.iter().enumerate() {
            sheet.write_string_with_format(0, idx as u16 + 1, column, &formats.header)?;
        }

        for (row_idx, row) in table.rows.iter().enumerate() {
            let excel_row = row_idx as u32 + 1;
            let banded = row_idx % 2 == 1;
            let (label_fmt, number_fmt, percent_fmt) = if row.is_total {
                (&formats.total_label, &formats.total_number, &formats.total_percent)
            } else if banded {
                (&formats.band_label, &formats.band_number, &formats.band_percent)
            } else {
                (&formats.label, &formats.number, &formats.percent)
            };

            sheet.write_string_with_format(excel_row, 0, &row.label, label_fmt)?;
            for (col_idx, cell) in row.cells.iter().enumerate() {
                let col = col_idx as u16 + 1;
                match cell {
                    Cell::Number(v) => sheet.write_number_with_format(excel_row, col, *v, number_fmt)?,
                    Cell::Percent(v) => sheet.write_number_with_format(excel_row, col, *v, percent_fmt)?,
                    Cell::Text(s) => sheet.write_string_with_format(excel_row, col, s, label_fmt)?,
                };
            }
        }

        sheet.set_column_width(0, 28)?;
        for idx in 0..table.columns.len() {
            sheet.set_column_width(idx as u16 + 1, 16)?;
        }
        sheet.set_freeze_panes(1, 1)?;
    }

    if tables.is_empty() {
        workbook.add_worksheet();
    }

    let bytes = workbook.save_to_buffer()?;
    info!("Exported {} table(s) to spreadsheet ({} bytes)", tables.len(), bytes.len());
    Ok(bytes)
}
