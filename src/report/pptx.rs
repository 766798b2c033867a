//! Slide-deck writer producing a minimal PresentationML package: a title
//! slide, a KPI tile grid, one slide per table and one slide per chart.

use crate::error::{Result, SalesReportError};
use crate::report::format::{
    hex_color, BAND_FILL, HEADER_FILL, HEADER_FONT, TEXT_COLOR, TILE_FILL, TOTAL_FILL,
};
use crate::report::table::ReportTable;
use crate::tracking::KpiTile;
use log::{info, warn};
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const EMU_PER_INCH: i64 = 914_400;
const SLIDE_W: i64 = 12_192_000;
const SLIDE_H: i64 = 6_858_000;
const MARGIN: i64 = EMU_PER_INCH / 2;
const BODY_TOP: i64 = EMU_PER_INCH * 6 / 5;
const KPI_COLUMNS: i64 = 4;
const MAX_KPI_TILES: usize = 10;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// A chart the deck embeds as a PNG. Rendering may fail; the deck then shows
/// a placeholder instead of aborting.
pub trait ChartSource {
    fn title(&self) -> &str;
    fn render_png(&self) -> Result<Vec<u8>>;
}

/// An already rendered chart image.
#[derive(Debug, Clone)]
pub struct PngChart {
    pub title: String,
    pub png: Vec<u8>,
}

impl ChartSource for PngChart {
    fn title(&self) -> &str {
        &self.title
    }

    fn render_png(&self) -> Result<Vec<u8>> {
        Ok(self.png.clone())
    }
}

#[derive(Debug)]
pub struct Deck {
    pub bytes: Vec<u8>,
    pub slide_count: usize,
    /// Titles of charts replaced by a text placeholder.
    pub placeholders: Vec<String>,
}

pub struct DeckBuilder<'a> {
    title: String,
    subtitle: Option<String>,
    kpis: Vec<KpiTile>,
    tables: Vec<&'a ReportTable>,
    charts: Vec<&'a dyn ChartSource>,
}

enum SlideBody {
    Shapes(String),
    Picture { shapes: String, png: Vec<u8> },
}

impl<'a> DeckBuilder<'a> {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            kpis: Vec::new(),
            tables: Vec::new(),
            charts: Vec::new(),
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    /// At most ten tiles are kept.
    pub fn kpis(mut self, tiles: Vec<KpiTile>) -> Self {
        self.kpis = tiles.into_iter().take(MAX_KPI_TILES).collect();
        self
    }

    pub fn table(mut self, table: &'a ReportTable) -> Self {
        self.tables.push(table);
        self
    }

    pub fn chart(mut self, chart: &'a dyn ChartSource) -> Self {
        self.charts.push(chart);
        self
    }

    pub fn build(self) -> Result<Deck> {
        let mut slides = Vec::new();
        let mut placeholders = Vec::new();

        slides.push(SlideBody::Shapes(title_slide(&self.title, self.subtitle.as_deref())));
        if !self.kpis.is_empty() {
            slides.push(SlideBody::Shapes(kpi_slide(&self.kpis)));
        }
        for table in &self.tables {
            slides.push(SlideBody::Shapes(table_slide(table)));
        }
        for chart in &self.charts {
            let rendered = chart
                .render_png()
                .and_then(|png| checked_png(chart.title(), png));
            match rendered {
                Ok((png, width, height)) => slides.push(SlideBody::Picture {
                    shapes: picture_slide(chart.title(), width, height),
                    png,
                }),
                Err(e) => {
                    warn!("Chart '{}' replaced by placeholder: {}", chart.title(), e);
                    placeholders.push(chart.title().to_string());
                    slides.push(SlideBody::Shapes(placeholder_slide(chart.title(), &e.to_string())));
                }
            }
        }

        let slide_count = slides.len();
        let bytes = write_package(slides)?;
        info!(
            "Built slide deck with {} slide(s), {} chart placeholder(s), {} bytes",
            slide_count,
            placeholders.len(),
            bytes.len()
        );

        Ok(Deck {
            bytes,
            slide_count,
            placeholders,
        })
    }
}

/// Returns the PNG with its pixel size, or a render error if it is not a PNG.
fn checked_png(title: &str, png: Vec<u8>) -> Result<(Vec<u8>, u32, u32)> {
    const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    let render_error = |details: &str| SalesReportError::Render {
        chart: title.to_string(),
        details: details.to_string(),
    };

    if png.len() < 24 || png[..8] != SIGNATURE || &png[12..16] != b"IHDR" {
        return Err(render_error("output is not a PNG image"));
    }
    let width = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
    let height = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
    if width == 0 || height == 0 {
        return Err(render_error("image has zero size"));
    }
    Ok((png, width, height))
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && c != '\t' && c != '\n' && c != '\r' => {}
            c => out.push(c),
        }
    }
    out
}

struct Run<'t> {
    text: &'t str,
    size: u32,
    bold: bool,
    color: u32,
}

fn run_xml(run: &Run<'_>) -> String {
    format!(
        r#"<a:r><a:rPr lang="en-US" sz="{}" b="{}" dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:rPr><a:t>{}</a:t></a:r>"#,
        run.size * 100,
        if run.bold { 1 } else { 0 },
        hex_color(run.color),
        escape_xml(run.text)
    )
}

fn paragraph_xml(run: &Run<'_>, align: &str) -> String {
    format!(r#"<a:p><a:pPr algn="{}"/>{}</a:p>"#, align, run_xml(run))
}

struct Frame {
    x: i64,
    y: i64,
    w: i64,
    h: i64,
}

fn text_box(id: usize, frame: &Frame, fill: Option<u32>, paragraphs: &[String], anchor: &str) -> String {
    let fill_xml = match fill {
        Some(rgb) => format!(r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#, hex_color(rgb)),
        None => "<a:noFill/>".to_string(),
    };
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Text {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{w}" cy="{h}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom>{fill}</p:spPr><p:txBody><a:bodyPr wrap="square" anchor="{anchor}"/><a:lstStyle/>{body}</p:txBody></p:sp>"#,
        id = id,
        x = frame.x,
        y = frame.y,
        w = frame.w,
        h = frame.h,
        fill = fill_xml,
        anchor = anchor,
        body = paragraphs.concat()
    )
}

fn heading(id: usize, text: &str) -> String {
    let frame = Frame {
        x: MARGIN,
        y: EMU_PER_INCH / 4,
        w: SLIDE_W - 2 * MARGIN,
        h: EMU_PER_INCH * 4 / 5,
    };
    let run = Run {
        text,
        size: 28,
        bold: true,
        color: HEADER_FILL,
    };
    text_box(id, &frame, None, &[paragraph_xml(&run, "l")], "ctr")
}

fn title_slide(title: &str, subtitle: Option<&str>) -> String {
    let mut shapes = String::new();
    let title_frame = Frame {
        x: MARGIN,
        y: SLIDE_H * 3 / 10,
        w: SLIDE_W - 2 * MARGIN,
        h: EMU_PER_INCH * 3 / 2,
    };
    let run = Run {
        text: title,
        size: 40,
        bold: true,
        color: HEADER_FILL,
    };
    shapes.push_str(&text_box(2, &title_frame, None, &[paragraph_xml(&run, "ctr")], "b"));

    if let Some(subtitle) = subtitle {
        let frame = Frame {
            x: MARGIN,
            y: title_frame.y + title_frame.h,
            w: title_frame.w,
            h: EMU_PER_INCH,
        };
        let run = Run {
            text: subtitle,
            size: 20,
            bold: false,
            color: TEXT_COLOR,
        };
        shapes.push_str(&text_box(3, &frame, None, &[paragraph_xml(&run, "ctr")], "t"));
    }
    shapes
}

fn kpi_slide(tiles: &[KpiTile]) -> String {
    let mut shapes = heading(2, "Key Metrics");
    let gap = EMU_PER_INCH / 5;
    let tile_w = (SLIDE_W - 2 * MARGIN - (KPI_COLUMNS - 1) * gap) / KPI_COLUMNS;
    let tile_h = EMU_PER_INCH * 7 / 5;

    for (idx, tile) in tiles.iter().take(MAX_KPI_TILES).enumerate() {
        let col = idx as i64 % KPI_COLUMNS;
        let row = idx as i64 / KPI_COLUMNS;
        let frame = Frame {
            x: MARGIN + col * (tile_w + gap),
            y: BODY_TOP + row * (tile_h + gap),
            w: tile_w,
            h: tile_h,
        };
        let label = Run {
            text: &tile.label,
            size: 14,
            bold: false,
            color: TEXT_COLOR,
        };
        let value = Run {
            text: &tile.value,
            size: 24,
            bold: true,
            color: HEADER_FILL,
        };
        shapes.push_str(&text_box(
            3 + idx,
            &frame,
            Some(TILE_FILL),
            &[paragraph_xml(&label, "ctr"), paragraph_xml(&value, "ctr")],
            "ctr",
        ));
    }
    shapes
}

fn table_cell(text: &str, size: u32, bold: bool, color: u32, fill: u32, align: &str) -> String {
    let run = Run {
        text,
        size,
        bold,
        color,
    };
    format!(
        r#"<a:tc><a:txBody><a:bodyPr/><a:lstStyle/>{}</a:txBody><a:tcPr marL="45720" marR="45720" marT="22860" marB="22860" anchor="ctr"><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:tcPr></a:tc>"#,
        paragraph_xml(&run, align),
        hex_color(fill)
    )
}

fn table_slide(table: &ReportTable) -> String {
    let mut shapes = heading(2, &table.title);

    let body_rows = table.rows.len() as i64 + 1;
    let available_h = SLIDE_H - BODY_TOP - MARGIN;
    let row_h = (available_h / body_rows.max(1)).min(EMU_PER_INCH * 2 / 5);
    let font = if body_rows > 14 { 9 } else { 12 };

    let width = SLIDE_W - 2 * MARGIN;
    let data_cols = table.columns.len() as i64;
    let index_w = if data_cols == 0 { width } else { width / 4 };
    let col_w = if data_cols == 0 { 0 } else { (width - index_w) / data_cols };

    let mut grid = format!(r#"<a:gridCol w="{}"/>"#, index_w);
    for _ in 0..data_cols {
        let _ = write!(grid, r#"<a:gridCol w="{}"/>"#, col_w);
    }

    let mut rows_xml = format!(r#"<a:tr h="{}">"#, row_h);
    rows_xml.push_str(&table_cell(&table.index_header, font, true, HEADER_FONT, HEADER_FILL, "l"));
    for column in &table.columns {
        rows_xml.push_str(&table_cell(column, font, true, HEADER_FONT, HEADER_FILL, "ctr"));
    }
    rows_xml.push_str("</a:tr>");

    for (idx, row) in table.rows.iter().enumerate() {
        let fill = if row.is_total {
            TOTAL_FILL
        } else if idx % 2 == 1 {
            BAND_FILL
        } else {
            0xFFFFFF
        };
        let _ = write!(rows_xml, r#"<a:tr h="{}">"#, row_h);
        rows_xml.push_str(&table_cell(&row.label, font, row.is_total, TEXT_COLOR, fill, "l"));
        for cell in &row.cells {
            rows_xml.push_str(&table_cell(&cell.display(), font, row.is_total, TEXT_COLOR, fill, "r"));
        }
        rows_xml.push_str("</a:tr>");
    }

    let _ = write!(
        shapes,
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="3" name="Table 3"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr><p:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{w}" cy="{h}"/></p:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblPr firstRow="1" bandRow="1"/><a:tblGrid>{grid}</a:tblGrid>{rows}</a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#,
        x = MARGIN,
        y = BODY_TOP,
        w = width,
        h = row_h * body_rows,
        grid = grid,
        rows = rows_xml
    );
    shapes
}

fn picture_slide(title: &str, width_px: u32, height_px: u32) -> String {
    let mut shapes = heading(2, title);

    let box_w = SLIDE_W - 2 * MARGIN;
    let box_h = SLIDE_H - BODY_TOP - MARGIN;
    let scale = f64::min(box_w as f64 / width_px as f64, box_h as f64 / height_px as f64);
    let w = (width_px as f64 * scale) as i64;
    let h = (height_px as f64 * scale) as i64;
    let x = MARGIN + (box_w - w) / 2;
    let y = BODY_TOP + (box_h - h) / 2;

    let _ = write!(
        shapes,
        r#"<p:pic><p:nvPicPr><p:cNvPr id="3" name="Chart 3" descr="{descr}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{w}" cy="{h}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
        descr = escape_xml(title),
        x = x,
        y = y,
        w = w,
        h = h
    );
    shapes
}

fn placeholder_slide(title: &str, reason: &str) -> String {
    let mut shapes = heading(2, title);
    let frame = Frame {
        x: MARGIN,
        y: BODY_TOP,
        w: SLIDE_W - 2 * MARGIN,
        h: SLIDE_H - BODY_TOP - MARGIN,
    };
    let text = format!("Chart unavailable: {}", reason);
    let run = Run {
        text: &text,
        size: 18,
        bold: false,
        color: TEXT_COLOR,
    };
    shapes.push_str(&text_box(3, &frame, Some(BAND_FILL), &[paragraph_xml(&run, "ctr")], "ctr"));
    shapes
}

fn slide_xml(shapes: &str) -> String {
    format!(
        r#"{decl}<p:sld {ns}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        decl = XML_DECL,
        ns = NS,
        shapes = shapes
    )
}

fn slide_rels(image: Option<usize>) -> String {
    let mut rels = format!(
        r#"{}<Relationships xmlns="{}"><Relationship Id="rId1" Type="{}/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>"#,
        XML_DECL, REL_NS, REL_TYPE
    );
    if let Some(n) = image {
        let _ = write!(
            rels,
            r#"<Relationship Id="rId2" Type="{}/image" Target="../media/image{}.png"/>"#,
            REL_TYPE, n
        );
    }
    rels.push_str("</Relationships>");
    rels
}

fn content_types(slide_count: usize) -> String {
    let mut xml = format!(
        r#"{}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#,
        XML_DECL
    );
    for n in 1..=slide_count {
        let _ = write!(
            xml,
            r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
            n
        );
    }
    xml.push_str("</Types>");
    xml
}

fn presentation_xml(slide_count: usize) -> String {
    let mut ids = String::new();
    for n in 0..slide_count {
        let _ = write!(ids, r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + n, 3 + n);
    }
    format!(
        r#"{decl}<p:presentation {ns} saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="{w}" cy="{h}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
        decl = XML_DECL,
        ns = NS,
        ids = ids,
        w = SLIDE_W,
        h = SLIDE_H
    )
}

fn presentation_rels(slide_count: usize) -> String {
    let mut rels = format!(
        r#"{decl}<Relationships xmlns="{ns}"><Relationship Id="rId1" Type="{t}/slideMaster" Target="slideMasters/slideMaster1.xml"/><Relationship Id="rId2" Type="{t}/theme" Target="theme/theme1.xml"/>"#,
        decl = XML_DECL,
        ns = REL_NS,
        t = REL_TYPE
    );
    for n in 1..=slide_count {
        let _ = write!(
            rels,
            r#"<Relationship Id="rId{}" Type="{}/slide" Target="slides/slide{}.xml"/>"#,
            n + 2,
            REL_TYPE,
            n
        );
    }
    rels.push_str("</Relationships>");
    rels
}

fn static_parts() -> Vec<(&'static str, String)> {
    let root_rels = format!(
        r#"{}<Relationships xmlns="{}"><Relationship Id="rId1" Type="{}/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#,
        XML_DECL, REL_NS, REL_TYPE
    );
    let empty_tree = r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree>"#;
    let master = format!(
        r#"{decl}<p:sldMaster {ns}><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg>{tree}</p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst><p:txStyles><p:titleStyle/><p:bodyStyle/><p:otherStyle/></p:txStyles></p:sldMaster>"#,
        decl = XML_DECL,
        ns = NS,
        tree = empty_tree
    );
    let master_rels = format!(
        r#"{decl}<Relationships xmlns="{ns}"><Relationship Id="rId1" Type="{t}/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="{t}/theme" Target="../theme/theme1.xml"/></Relationships>"#,
        decl = XML_DECL,
        ns = REL_NS,
        t = REL_TYPE
    );
    let layout = format!(
        r#"{decl}<p:sldLayout {ns} type="blank" preserve="1"><p:cSld name="Blank">{tree}</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
        decl = XML_DECL,
        ns = NS,
        tree = empty_tree
    );
    let layout_rels = format!(
        r#"{}<Relationships xmlns="{}"><Relationship Id="rId1" Type="{}/slideMaster" Target="../slideMasters/slideMaster1.xml"/></Relationships>"#,
        XML_DECL, REL_NS, REL_TYPE
    );

    vec![
        ("_rels/.rels", root_rels),
        ("ppt/slideMasters/slideMaster1.xml", master),
        ("ppt/slideMasters/_rels/slideMaster1.xml.rels", master_rels),
        ("ppt/slideLayouts/slideLayout1.xml", layout),
        ("ppt/slideLayouts/_rels/slideLayout1.xml.rels", layout_rels),
        ("ppt/theme/theme1.xml", theme_xml()),
    ]
}

fn theme_xml() -> String {
    let colors = [
        ("dk1", "000000"),
        ("lt1", "FFFFFF"),
        ("dk2", "44546A"),
        ("lt2", "E7E6E6"),
        ("accent1", "1F4E79"),
        ("accent2", "ED7D31"),
        ("accent3", "A5A5A5"),
        ("accent4", "FFC000"),
        ("accent5", "5B9BD5"),
        ("accent6", "70AD47"),
        ("hlink", "0563C1"),
        ("folHlink", "954F72"),
    ];
    let mut scheme = String::new();
    for (name, rgb) in colors {
        let _ = write!(scheme, r#"<a:{n}><a:srgbClr val="{rgb}"/></a:{n}>"#, n = name, rgb = rgb);
    }
    let fill = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = r#"<a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#;
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";

    format!(
        r#"{decl}<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Sales Report"><a:themeElements><a:clrScheme name="Sales Report">{scheme}</a:clrScheme><a:fontScheme name="Sales Report"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Sales Report"><a:fillStyleLst>{f}{f}{f}</a:fillStyleLst><a:lnStyleLst>{l}{l}{l}</a:lnStyleLst><a:effectStyleLst>{e}{e}{e}</a:effectStyleLst><a:bgFillStyleLst>{f}{f}{f}</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#,
        decl = XML_DECL,
        scheme = scheme,
        f = fill,
        l = line,
        e = effect
    )
}

fn write_package(slides: Vec<SlideBody>) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let slide_count = slides.len();
    let mut parts: Vec<(String, Vec<u8>)> = vec![
        ("[Content_Types].xml".to_string(), content_types(slide_count).into_bytes()),
        ("ppt/presentation.xml".to_string(), presentation_xml(slide_count).into_bytes()),
        (
            "ppt/_rels/presentation.xml.rels".to_string(),
            presentation_rels(slide_count).into_bytes(),
        ),
    ];
    parts.extend(
        static_parts()
            .into_iter()
            .map(|(name, xml)| (name.to_string(), xml.into_bytes())),
    );

    let mut image_count = 0;
    for (idx, slide) in slides.into_iter().enumerate() {
        let n = idx + 1;
        let (shapes, image) = match slide {
            SlideBody::Shapes(shapes) => (shapes, None),
            SlideBody::Picture { shapes, png } => {
                image_count += 1;
                parts.push((format!("ppt/media/image{}.png", image_count), png));
                (shapes, Some(image_count))
            }
        };
        parts.push((format!("ppt/slides/slide{}.xml", n), slide_xml(&shapes).into_bytes()));
        parts.push((
            format!("ppt/slides/_rels/slide{}.xml.rels", n),
            slide_rels(image).into_bytes(),
        ));
    }

    for (name, bytes) in parts {
        zip.start_file(name, options)?;
        zip.write_all(&bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::table::Cell;
    use std::io::Read;
    use zip::ZipArchive;

    struct BrokenChart;

    impl ChartSource for BrokenChart {
        fn title(&self) -> &str {
            "Daily Trend"
        }

        fn render_png(&self) -> Result<Vec<u8>> {
            Err(SalesReportError::Render {
                chart: "Daily Trend".to_string(),
                details: "backend unavailable".to_string(),
            })
        }
    }

    fn tiny_png() -> Vec<u8> {
        let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
        png.extend_from_slice(b"IHDR");
        png.extend_from_slice(&640u32.to_be_bytes());
        png.extend_from_slice(&480u32.to_be_bytes());
        png.extend_from_slice(&[8, 2, 0, 0, 0]);
        png
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("A & B <C> \"q\""), "A &amp; B &lt;C&gt; &quot;q&quot;");
    }

    #[test]
    fn test_checked_png() {
        let (_, w, h) = checked_png("c", tiny_png()).unwrap();
        assert_eq!((w, h), (640, 480));
        assert!(matches!(
            checked_png("c", b"GIF89a not a png at all".to_vec()),
            Err(SalesReportError::Render { .. })
        ));
    }

    #[test]
    fn test_deck_layout_and_placeholder() {
        let mut table = ReportTable::new("Sales & Targets", "Salesman", vec!["Actual".to_string()]);
        table.push_row("Alice", vec![Cell::Number(1500.0)]);
        table.push_total(vec![Cell::Number(1500.0)]);

        let good = PngChart {
            title: "Sales by Branch".to_string(),
            png: tiny_png(),
        };
        let broken = BrokenChart;
        let tiles: Vec<KpiTile> = (0..12)
            .map(|i| KpiTile {
                label: format!("Metric {}", i),
                value: i.to_string(),
            })
            .collect();

        let deck = DeckBuilder::new("January Review")
            .subtitle("2024-01-01 to 2024-01-31")
            .kpis(tiles)
            .table(&table)
            .chart(&good)
            .chart(&broken)
            .build()
            .unwrap();

        assert_eq!(deck.slide_count, 5);
        assert_eq!(deck.placeholders, vec!["Daily Trend".to_string()]);

        let presentation = read_entry(&deck.bytes, "ppt/presentation.xml");
        assert_eq!(presentation.matches("<p:sldId ").count(), 5);

        let kpi = read_entry(&deck.bytes, "ppt/slides/slide2.xml");
        assert!(kpi.contains("Metric 9"));
        assert!(!kpi.contains("Metric 10"));

        let table_xml = read_entry(&deck.bytes, "ppt/slides/slide3.xml");
        assert!(table_xml.contains("Sales &amp; Targets"));
        assert!(table_xml.contains("1,500"));
        assert!(table_xml.contains(&hex_color(TOTAL_FILL)));

        let rels = read_entry(&deck.bytes, "ppt/slides/_rels/slide4.xml.rels");
        assert!(rels.contains("../media/image1.png"));

        let placeholder = read_entry(&deck.bytes, "ppt/slides/slide5.xml");
        assert!(placeholder.contains("Chart unavailable"));
        assert!(placeholder.contains("backend unavailable"));
    }

    #[test]
    fn test_title_only_deck() {
        let deck = DeckBuilder::new("Empty").build().unwrap();
        assert_eq!(deck.slide_count, 1);
        let types = read_entry(&deck.bytes, "[Content_Types].xml");
        assert!(types.contains("/ppt/slides/slide1.xml"));
        assert!(!types.contains("/ppt/slides/slide2.xml"));
    }
}
