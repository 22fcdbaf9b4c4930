//! Drawing radar figures with plotters.
//!
//! The radar is drawn through a square `Cartesian2d` coordinate spec laid
//! over part of the page, so polygons and labels are placed in plot units
//! while the title, legend and table use page pixels. Only primitive
//! elements are used; nothing here needs text metrics, so SVG output works
//! without system fonts. Raster pages draw through [`GlyphFallback`] for the
//! same reason.

use std::fs;
use std::path::{Path, PathBuf};

use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::figure::{
    build_radar_figure, HAlign, RadarFigure, RenderOptions, TableLayout, GRID_RING, GRID_SPOKE,
    HEADER_FILL, PLOT_LIMIT, RING_LABEL, TABLE_COLUMN_WIDTHS, TABLE_EDGE, TEXT,
};
use crate::history::HistoryEntry;
use crate::raster::GlyphFallback;
use crate::RadarError;

const FONT: FontFamily<'static> = FontFamily::SansSerif;
const TITLE_SIZE: f64 = 26.0;
const AXIS_LABEL_SIZE: f64 = 16.0;
const RING_LABEL_SIZE: f64 = 12.0;
const LEGEND_SIZE: f64 = 14.0;
const LEGEND_ROW: i32 = 22;
const LEGEND_COLUMN: i32 = 190;
const MAX_ROW_HEIGHT: i32 = 28;
const MIN_ROW_HEIGHT: i32 = 14;

/// An axis-aligned pixel box on the page.
#[derive(Clone, Copy, Debug)]
struct Band {
    left: i32,
    top: i32,
    width: i32,
    height: i32,
}

impl Band {
    fn bottom(&self) -> i32 {
        self.top + self.height
    }

    fn centre_x(&self) -> i32 {
        self.left + self.width / 2
    }
}

fn font(size: f64, bold: bool) -> FontDesc<'static> {
    let style = if bold {
        FontStyle::Bold
    } else {
        FontStyle::Normal
    };
    FontDesc::new(FONT, size, style)
}

fn text_style(size: f64, bold: bool, color: &RGBColor, h: HPos, v: VPos) -> TextStyle<'static> {
    font(size, bold).color(color).pos(Pos::new(h, v))
}

fn stroke(color: &RGBColor, width: u32) -> ShapeStyle {
    ShapeStyle {
        color: color.to_rgba(),
        filled: false,
        stroke_width: width,
    }
}

fn legend_height(entries: usize) -> i32 {
    let rows = entries.div_ceil(2) as i32;
    rows * LEGEND_ROW + 12
}

fn draw_title<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    page: Band,
) -> Result<(), RadarError> {
    let y = (page.height as f64 * 0.035) as i32;
    root.draw(&Text::new(
        title.to_string(),
        (page.centre_x(), y),
        text_style(TITLE_SIZE, false, &TEXT, HPos::Center, VPos::Center),
    ))?;
    Ok(())
}

/// Draw the grid, axis labels and one filled polygon per date into `band`.
fn draw_radar<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &RadarFigure,
    band: Band,
) -> Result<(), RadarError> {
    let side = band.width.min(band.height);
    let x0 = band.centre_x() - side / 2;
    let y0 = band.top + (band.height - side) / 2;
    let plot = root.apply_coord_spec(Cartesian2d::<RangedCoordf64, RangedCoordf64>::new(
        -PLOT_LIMIT..PLOT_LIMIT,
        -PLOT_LIMIT..PLOT_LIMIT,
        (x0..x0 + side, y0..y0 + side),
    ));

    let grid = &figure.grid;
    for ring in &grid.rings {
        plot.draw(&PathElement::new(
            ring.vertices.clone(),
            stroke(&GRID_RING, 1),
        ))?;
    }
    for &end in &grid.spokes {
        plot.draw(&PathElement::new(
            vec![(0.0, 0.0), end],
            stroke(&GRID_SPOKE, 1),
        ))?;
    }
    for ring in &grid.rings {
        plot.draw(&Text::new(
            ring.label.clone(),
            ring.label_at,
            text_style(
                RING_LABEL_SIZE,
                false,
                &RING_LABEL,
                HPos::Center,
                VPos::Bottom,
            ),
        ))?;
    }
    for label in &grid.labels {
        let h = match label.align {
            HAlign::Left => HPos::Left,
            HAlign::Center => HPos::Center,
            HAlign::Right => HPos::Right,
        };
        plot.draw(&Text::new(
            label.text,
            label.position,
            text_style(AXIS_LABEL_SIZE, false, &TEXT, h, VPos::Center),
        ))?;
    }

    for trace in &figure.traces {
        plot.draw(&Polygon::new(
            trace.points.clone(),
            trace.color.mix(0.15).filled(),
        ))?;
        plot.draw(&PathElement::new(
            trace.points.clone(),
            trace.color.stroke_width(2),
        ))?;
    }
    Ok(())
}

/// Two-column legend centred in `band`, one entry per date.
fn draw_legend<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &RadarFigure,
    band: Band,
) -> Result<(), RadarError> {
    let columns = figure.traces.len().min(2) as i32;
    let left = band.centre_x() - columns * LEGEND_COLUMN / 2;
    for (idx, trace) in figure.traces.iter().enumerate() {
        let x = left + (idx as i32 % 2) * LEGEND_COLUMN;
        let y = band.top + 6 + (idx as i32 / 2) * LEGEND_ROW + LEGEND_ROW / 2;
        root.draw(&PathElement::new(
            vec![(x, y), (x + 28, y)],
            trace.color.stroke_width(2),
        ))?;
        root.draw(&Text::new(
            trace.date_label.clone(),
            (x + 36, y),
            text_style(LEGEND_SIZE, false, &TEXT, HPos::Left, VPos::Center),
        ))?;
    }
    Ok(())
}

struct CellStyle {
    fill: RGBColor,
    color: RGBColor,
    bold: bool,
    size: f64,
}

fn draw_cell<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    (top_left, bottom_right): ((i32, i32), (i32, i32)),
    text: &str,
    style: &CellStyle,
) -> Result<(), RadarError> {
    root.draw(&Rectangle::new([top_left, bottom_right], style.fill.filled()))?;
    root.draw(&Rectangle::new([top_left, bottom_right], stroke(&TABLE_EDGE, 1)))?;
    let centre = (
        (top_left.0 + bottom_right.0) / 2,
        (top_left.1 + bottom_right.1) / 2,
    );
    root.draw(&Text::new(
        text.to_string(),
        centre,
        text_style(style.size, style.bold, &style.color, HPos::Center, VPos::Center),
    ))?;
    Ok(())
}

/// Header plus date/delta rows. Row height shrinks to fit `band` when a
/// long history would overflow it.
fn draw_table<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &RadarFigure,
    band: Band,
    centred: bool,
) -> Result<(), RadarError> {
    let table = &figure.table;
    let row_count = table.rows.len() as i32 + 1;
    let row_h = (band.height / row_count.max(1)).clamp(MIN_ROW_HEIGHT, MAX_ROW_HEIGHT);
    let font_size = (row_h as f64 * 0.5).min(13.0);
    let top = if centred {
        band.top + (band.height - row_h * row_count).max(0) / 2
    } else {
        band.top
    };

    let mut edges = Vec::with_capacity(TABLE_COLUMN_WIDTHS.len() + 1);
    let mut x = band.left as f64;
    edges.push(band.left);
    for frac in TABLE_COLUMN_WIDTHS {
        x += frac * band.width as f64;
        edges.push(x.round() as i32);
    }

    let cell_box = |col: usize, row: i32| {
        (
            (edges[col], top + row * row_h),
            (edges[col + 1], top + (row + 1) * row_h),
        )
    };
    for (col, title) in table.header.iter().enumerate() {
        let cell = CellStyle {
            fill: HEADER_FILL,
            color: TEXT,
            bold: true,
            size: font_size,
        };
        draw_cell(root, cell_box(col, 0), title, &cell)?;
    }
    for (idx, row) in table.rows.iter().enumerate() {
        for (col, cell) in row.cells.iter().enumerate() {
            let style = CellStyle {
                fill: row.fill,
                color: cell.color,
                bold: cell.bold,
                size: font_size,
            };
            draw_cell(root, cell_box(col, idx as i32 + 1), &cell.text, &style)?;
        }
    }
    Ok(())
}

fn page_band(options: &RenderOptions) -> Band {
    Band {
        left: 0,
        top: 0,
        width: options.width as i32,
        height: options.height as i32,
    }
}

/// Chart, legend and table stacked on one page.
fn draw_combined_page<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &RadarFigure,
) -> Result<(), RadarError> {
    let page = page_band(&figure.options);
    root.fill(&WHITE)?;
    draw_title(root, &figure.title, page)?;

    let margin_x = (page.width as f64 * 0.06) as i32;
    let content_w = page.width - 2 * margin_x;
    let chart = Band {
        left: margin_x,
        top: (page.height as f64 * 0.08) as i32,
        width: content_w,
        height: (page.height as f64 * 0.56) as i32,
    };
    let legend = Band {
        left: margin_x,
        top: chart.bottom(),
        width: content_w,
        height: legend_height(figure.traces.len()),
    };
    let bottom = (page.height as f64 * 0.95) as i32;
    let table = Band {
        left: margin_x,
        top: legend.bottom() + 8,
        width: content_w,
        height: (bottom - legend.bottom() - 8).max(MIN_ROW_HEIGHT * 2),
    };

    draw_radar(root, figure, chart)?;
    draw_legend(root, figure, legend)?;
    draw_table(root, figure, table, true)
}

fn draw_chart_page<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &RadarFigure,
) -> Result<(), RadarError> {
    let page = page_band(&figure.options);
    root.fill(&WHITE)?;
    draw_title(root, &figure.title, page)?;

    let margin_x = (page.width as f64 * 0.06) as i32;
    let legend_h = legend_height(figure.traces.len());
    let top = (page.height as f64 * 0.08) as i32;
    let bottom = (page.height as f64 * 0.95) as i32;
    let chart = Band {
        left: margin_x,
        top,
        width: page.width - 2 * margin_x,
        height: bottom - top - legend_h,
    };
    let legend = Band {
        top: chart.bottom(),
        height: legend_h,
        ..chart
    };
    draw_radar(root, figure, chart)?;
    draw_legend(root, figure, legend)
}

fn draw_table_page<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &RadarFigure,
) -> Result<(), RadarError> {
    let page = page_band(&figure.options);
    root.fill(&WHITE)?;
    draw_title(root, &figure.title, page)?;

    let margin_x = (page.width as f64 * 0.06) as i32;
    let top = (page.height as f64 * 0.08) as i32;
    let table = Band {
        left: margin_x,
        top,
        width: page.width - 2 * margin_x,
        height: (page.height as f64 * 0.95) as i32 - top,
    };
    draw_table(root, figure, table, false)
}

pub fn page_count(layout: TableLayout) -> usize {
    match layout {
        TableLayout::Below => 1,
        TableLayout::Separate => 2,
    }
}

/// Paint page `page` of `figure` onto any plotters backend. With the
/// `Below` layout there is one page; `Separate` has the chart on page 0 and
/// the table on page 1.
pub fn draw_figure<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &RadarFigure,
    page: usize,
) -> Result<(), RadarError> {
    match (figure.options.table_layout, page) {
        (TableLayout::Below, _) => draw_combined_page(root, figure),
        (TableLayout::Separate, 0) => draw_chart_page(root, figure),
        (TableLayout::Separate, _) => draw_table_page(root, figure),
    }
}

/// Draw every page of `figure` as a standalone SVG document.
pub fn render_svg_pages(figure: &RadarFigure) -> Result<Vec<String>, RadarError> {
    let size = (figure.options.width, figure.options.height);
    let mut out = Vec::new();
    for page in 0..page_count(figure.options.table_layout) {
        let mut buffer = String::new();
        {
            let root = SVGBackend::with_string(&mut buffer, size).into_drawing_area();
            draw_figure(&root, figure, page)?;
            root.present()?;
        }
        out.push(buffer);
    }
    Ok(out)
}

/// One athlete's rendered pages.
#[derive(Clone, Debug)]
pub struct RenderedFigure {
    pub athlete_name: String,
    pub figure: RadarFigure,
    pub pages: Vec<String>,
}

/// Build and draw one athlete's figure. `entries` are in display order and
/// hold 0–100 values.
pub fn render_athlete_figure(
    athlete_name: &str,
    entries: &[HistoryEntry],
    options: &RenderOptions,
) -> Result<RenderedFigure, RadarError> {
    options.validate()?;
    let figure = build_radar_figure(athlete_name, entries, options);
    let pages = render_svg_pages(&figure)?;
    Ok(RenderedFigure {
        athlete_name: athlete_name.to_string(),
        figure,
        pages,
    })
}

/// Output paths for a raster export: the chart page at `path`, and with a
/// separate table page a sibling `<stem>_table.<ext>`.
pub fn png_paths(path: &Path, layout: TableLayout) -> Vec<PathBuf> {
    let mut paths = vec![path.to_path_buf()];
    if layout == TableLayout::Separate {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "radar".into());
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "png".into());
        paths.push(path.with_file_name(format!("{stem}_table.{ext}")));
    }
    paths
}

/// Rasterise the figure. Returns the files written; on failure no partial
/// page is left behind.
pub fn render_png(figure: &RadarFigure, path: &Path) -> Result<Vec<PathBuf>, RadarError> {
    let paths = png_paths(path, figure.options.table_layout);
    for (page, target) in paths.iter().enumerate() {
        if let Err(err) = draw_png_page(figure, target, page) {
            remove_pngs(&paths);
            return Err(err);
        }
    }
    Ok(paths)
}

fn draw_png_page(figure: &RadarFigure, target: &Path, page: usize) -> Result<(), RadarError> {
    let size = (figure.options.width, figure.options.height);
    let root = GlyphFallback::new(BitMapBackend::new(target, size)).into_drawing_area();
    draw_figure(&root, figure, page)?;
    root.present()?;
    Ok(())
}

/// Delete whatever a failed raster export managed to write.
pub fn remove_pngs(paths: &[PathBuf]) {
    for path in paths {
        if path.exists() {
            let _ = fs::remove_file(path);
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Combine figures into one printable HTML document, one page per SVG.
pub fn render_document(title: &str, figures: &[RenderedFigure]) -> String {
    let (width, height) = figures
        .first()
        .map(|f| (f.figure.options.width, f.figure.options.height))
        .unwrap_or((850, 1100));
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_html(title)));
    html.push_str("<style>\n");
    html.push_str(&format!(
        "@page {{ size: {:.2}in {:.2}in; margin: 0; }}\n",
        width as f64 / 100.0,
        height as f64 / 100.0
    ));
    html.push_str("body { margin: 0; background: #e5e7eb; font-family: sans-serif; }\n");
    html.push_str(".page { background: #fff; margin: 16px auto; width: fit-content; break-after: page; page-break-after: always; }\n");
    html.push_str(".page svg { display: block; }\n");
    html.push_str("@media print { body { background: none; } .page { margin: 0; } }\n");
    html.push_str("</style>\n</head>\n<body>\n");
    for rendered in figures {
        for (idx, page) in rendered.pages.iter().enumerate() {
            html.push_str(&format!(
                "<section class=\"page\" data-athlete=\"{}\" data-page=\"{}\">\n",
                escape_html(&rendered.athlete_name),
                idx + 1
            ));
            html.push_str(page);
            html.push_str("\n</section>\n");
        }
    }
    html.push_str("</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::AXIS_COUNT;

    fn entries() -> Vec<HistoryEntry> {
        vec![
            HistoryEntry {
                date_label: "2026-01-01".into(),
                values: [50.0, 25.0, 75.0, 100.0, 62.5],
            },
            HistoryEntry {
                date_label: "2026-02-01".into(),
                values: [62.0, 25.0, 70.0, 100.0, 75.0],
            },
        ]
    }

    #[test]
    fn svg_page_carries_title_labels_and_table() {
        let rendered =
            render_athlete_figure("Ana Silva", &entries(), &RenderOptions::default()).unwrap();
        assert_eq!(rendered.pages.len(), 1);
        let svg = &rendered.pages[0];
        assert!(svg.contains("Ana Silva"));
        assert!(svg.contains("Jump Height"));
        assert!(svg.contains("Delta"));
        assert!(svg.contains("2026-02-01"));
        assert!(svg.contains("+12"));
        assert!(svg.contains("62.5%"));
    }

    #[test]
    fn separate_layout_adds_table_page() {
        let options = RenderOptions {
            table_layout: TableLayout::Separate,
            ..RenderOptions::default()
        };
        let rendered = render_athlete_figure("Bo", &entries(), &options).unwrap();
        assert_eq!(rendered.pages.len(), 2);
        assert!(!rendered.pages[0].contains("Delta"));
        assert!(rendered.pages[1].contains("Delta"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let options = RenderOptions::default();
        let a = render_athlete_figure("Cy", &entries(), &options).unwrap();
        let b = render_athlete_figure("Cy", &entries(), &options).unwrap();
        assert_eq!(a.pages, b.pages);
    }

    #[test]
    fn invalid_options_are_rejected() {
        let options = RenderOptions {
            ring_levels: vec![-5.0],
            ..RenderOptions::default()
        };
        assert!(matches!(
            render_athlete_figure("Cy", &entries(), &options),
            Err(RadarError::InvalidParameter(_))
        ));
    }

    #[test]
    fn long_history_still_renders() {
        let many: Vec<HistoryEntry> = (0..14)
            .map(|i| HistoryEntry {
                date_label: format!("2026-01-{:02}", i + 1),
                values: [(i * 7) as f64; AXIS_COUNT],
            })
            .collect();
        let rendered = render_athlete_figure("Dee", &many, &RenderOptions::default()).unwrap();
        assert!(rendered.pages[0].contains("2026-01-14"));
    }

    #[test]
    fn document_wraps_each_page() {
        let options = RenderOptions {
            table_layout: TableLayout::Separate,
            ..RenderOptions::default()
        };
        let figures = vec![
            render_athlete_figure("A & B", &entries(), &options).unwrap(),
            render_athlete_figure("Cy", &entries()[..1], &options).unwrap(),
        ];
        let html = render_document("Team <CMJ>", &figures);
        assert!(html.contains("<title>Team &lt;CMJ&gt;</title>"));
        assert_eq!(html.matches("<section class=\"page\"").count(), 4);
        assert!(html.contains("data-athlete=\"A &amp; B\""));
        assert!(html.contains("size: 8.50in 11.00in"));
    }

    #[test]
    fn split_png_paths() {
        let paths = png_paths(Path::new("out/Ana.png"), TableLayout::Separate);
        assert_eq!(
            paths,
            vec![PathBuf::from("out/Ana.png"), PathBuf::from("out/Ana_table.png")]
        );
        assert_eq!(png_paths(Path::new("out/Ana.png"), TableLayout::Below).len(), 1);
    }

    #[test]
    fn writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let figure = build_radar_figure("Ana", &entries(), &RenderOptions::default());
        let written = render_png(&figure, &dir.path().join("Ana.png")).unwrap();
        assert_eq!(written.len(), 1);
        assert!(fs::metadata(&written[0]).unwrap().len() > 0);

        let options = RenderOptions {
            table_layout: TableLayout::Separate,
            ..RenderOptions::default()
        };
        let figure = build_radar_figure("Bo", &entries(), &options);
        let written = render_png(&figure, &dir.path().join("Bo.png")).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|p| p.exists()));
    }

    #[test]
    fn removes_partial_pngs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = png_paths(&dir.path().join("Cy.png"), TableLayout::Separate);
        fs::write(&paths[0], b"partial").unwrap();
        remove_pngs(&paths);
        assert!(paths.iter().all(|p| !p.exists()));
    }
}
