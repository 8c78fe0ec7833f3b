//! HTML/CSS projection of laid-out pages.
//!
//! Every page is a fixed-size `.page` block with absolutely positioned
//! regions and boxes, separated by explicit page breaks.

use qrcode::{EcLevel, QrCode};

use super::Rasterizer;
use crate::binding::path::format_number;
use crate::engine::RenderedDocument;
use crate::error::FolioError;
use crate::layout::{BoxContent, LayoutBox, PageLayout, TableContent};
use crate::template::{Font, FontSource, Style};

/// Rasterizer producing a standalone HTML document.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRasterizer;

impl Rasterizer for HtmlRasterizer {
    fn content_type(&self) -> &'static str {
        "text/html; charset=utf-8"
    }

    fn rasterize(&self, doc: &RenderedDocument) -> Result<Vec<u8>, FolioError> {
        Ok(render_html(doc).into_bytes())
    }
}

fn pt(v: f64) -> String {
    format!("{}pt", format_number(v))
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn quote_family(name: &str) -> String {
    if name.chars().any(char::is_whitespace) {
        format!("'{}'", name.replace('\'', "\\'"))
    } else {
        name.to_string()
    }
}

/// CSS font-family list: the font, then its declared fallbacks.
fn font_family(fonts: &[Font], name: &str) -> String {
    let fallback = fonts
        .iter()
        .find(|f| f.name == name)
        .map(|f| f.fallback.as_slice())
        .unwrap_or_default();
    std::iter::once(name)
        .chain(fallback.iter().map(String::as_str))
        .map(quote_family)
        .collect::<Vec<_>>()
        .join(", ")
}

fn style_css(style: &Style, fonts: &[Font]) -> String {
    let mut css = Vec::new();
    if let Some(font) = style.font.as_deref().filter(|f| !f.is_empty()) {
        css.push(format!("font-family:{}", font_family(fonts, font)));
    }
    if let Some(size) = style.size {
        css.push(format!("font-size:{}", pt(size)));
    }
    if let Some(weight) = &style.weight {
        css.push(format!("font-weight:{}", weight));
    }
    if let Some(font_style) = &style.font_style {
        css.push(format!("font-style:{}", font_style));
    }
    if let Some(color) = &style.color {
        css.push(format!("color:{}", color));
    }
    if let Some(align) = &style.align {
        css.push(format!("text-align:{}", align));
    }
    if let Some(lh) = style.line_height {
        css.push(format!("line-height:{}", pt(lh)));
    }
    if let (Some(color), Some(width)) = (&style.border_color, style.border_width) {
        css.push(format!("border:{} solid {}", pt(width), color));
    }
    if let Some(radius) = style.border_radius {
        css.push(format!("border-radius:{}", pt(radius)));
    }
    if let Some(fill) = &style.fill {
        css.push(format!("background-color:{}", fill));
    }
    if let Some(opacity) = style.opacity {
        css.push(format!("opacity:{}", opacity));
    }
    escape_html(&css.join(";"))
}

/// Body of a double-quoted CSS string. `<` is hex-escaped so the text can
/// never close the surrounding `<style>` element.
fn css_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '<' => out.push_str("\\3c "),
            '\n' | '\r' => out.push_str("\\a "),
            c => out.push(c),
        }
    }
    out
}

/// `@font-face` rules for fonts loaded from a URL or data URI.
pub fn font_faces(fonts: &[Font]) -> String {
    fonts
        .iter()
        .filter_map(|font| {
            let src = match font.source {
                FontSource::Local => return None,
                FontSource::Url => font.url.as_deref(),
                FontSource::Data => font.data.as_deref(),
            }?;
            (!font.name.is_empty() && !src.is_empty()).then(|| {
                format!(
                    "@font-face{{font-family:\"{}\";src:url(\"{}\");font-display:swap;}}",
                    css_string(&font.name),
                    css_string(src)
                )
            })
        })
        .collect()
}

fn ec_level(ecc: &str) -> EcLevel {
    match ecc.to_ascii_uppercase().as_str() {
        "L" => EcLevel::L,
        "Q" => EcLevel::Q,
        "H" => EcLevel::H,
        _ => EcLevel::M,
    }
}

/// Inline SVG with one rect per dark module, scaled to the box.
fn qr_svg(value: &str, ecc: &str) -> Option<String> {
    let code = match QrCode::with_error_correction_level(value, ec_level(ecc)) {
        Ok(code) => code,
        Err(e) => {
            tracing::warn!(error = %e, "QR code generation failed");
            return None;
        }
    };
    let size = code.width();
    let mut rects = String::new();
    for qy in 0..size {
        for qx in 0..size {
            if code[(qx, qy)] == qrcode::Color::Dark {
                rects.push_str(&format!("<rect x=\"{}\" y=\"{}\" width=\"1\" height=\"1\"/>", qx, qy));
            }
        }
    }
    Some(format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {size} {size}\" width=\"100%\" height=\"100%\" shape-rendering=\"crispEdges\">{}</svg>",
        rects
    ))
}

fn table_html(content: &TableContent, fonts: &[Font]) -> String {
    let rh = content.row_height;
    let cell_metrics = format!("height:{};line-height:{}", pt(rh), pt((rh - 4.0).max(0.0)));
    let header_css = style_css(&content.header_style, fonts);
    let row_css = style_css(&content.row_style, fonts);

    let colgroup: String = content
        .columns
        .iter()
        .map(|c| match c.w {
            Some(w) => format!("<col style=\"width:{};\" />", pt(w)),
            None => "<col />".to_string(),
        })
        .collect();
    let align = |i: usize| {
        content
            .columns
            .get(i)
            .and_then(|c| c.align.as_deref())
            .unwrap_or("left")
            .to_string()
    };
    let header: String = content
        .header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            format!(
                "<th style=\"{};text-align:{};{}\">{}</th>",
                header_css,
                align(i),
                cell_metrics,
                escape_html(h)
            )
        })
        .collect();
    let body: String = content
        .rows
        .iter()
        .map(|row| {
            let cells: String = row
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    format!(
                        "<td style=\"{};text-align:{};{}\">{}</td>",
                        row_css,
                        align(i),
                        cell_metrics,
                        escape_html(cell)
                    )
                })
                .collect();
            format!("<tr>{}</tr>", cells)
        })
        .collect();

    format!(
        "<table class=\"tbl\"><colgroup>{}</colgroup><thead><tr>{}</tr></thead><tbody>{}</tbody></table>",
        colgroup, header, body
    )
}

fn box_html(b: &LayoutBox, fonts: &[Font]) -> String {
    let mut geometry = format!(
        "left:{};top:{};width:{};height:{}",
        pt(b.x),
        pt(b.y),
        pt(b.w),
        pt(b.h)
    );
    if let Some(z) = b.z {
        geometry.push_str(&format!(";z-index:{}", z));
    }
    let css = style_css(&b.style, fonts);
    let id = escape_html(&b.id);

    match &b.content {
        BoxContent::Text { text, rich } => {
            let (body, white_space) = if *rich {
                (text.clone(), "normal")
            } else {
                (escape_html(text), "pre-wrap")
            };
            format!(
                "<div class=\"el {}\" data-id=\"{}\" style=\"{};{};white-space:{};\">{}</div>",
                if b.kind == "flowText" { "flow-text" } else { "text" },
                id,
                geometry,
                css,
                white_space,
                body
            )
        }
        BoxContent::Image { src, fit } => format!(
            "<img class=\"el image\" data-id=\"{}\" src=\"{}\" style=\"{};object-fit:{};\" />",
            id,
            escape_html(src),
            geometry,
            escape_html(fit)
        ),
        BoxContent::Table(content) => format!(
            "<div class=\"el table\" data-id=\"{}\" style=\"{};overflow:hidden;\">{}</div>",
            id,
            geometry,
            table_html(content, fonts)
        ),
        BoxContent::Qr { value, ecc } => {
            let inner = qr_svg(value, ecc).unwrap_or_default();
            format!(
                "<div class=\"el qr\" data-id=\"{}\" style=\"{};{};\">{}</div>",
                id, geometry, css, inner
            )
        }
        BoxContent::Line { color, width } => format!(
            "<div class=\"el line\" data-id=\"{}\" style=\"{};border-top:{} solid {};height:0;\"></div>",
            id,
            geometry,
            pt(*width),
            escape_html(color)
        ),
        BoxContent::Box => format!(
            "<div class=\"el box\" data-id=\"{}\" style=\"{};{};\"></div>",
            id, geometry, css
        ),
    }
}

fn page_html(page: &PageLayout, fonts: &[Font]) -> String {
    let region = |boxes: &[LayoutBox]| -> String { boxes.iter().map(|b| box_html(b, fonts)).collect() };
    format!(
        "<div class=\"page\" data-page=\"{}\">\n<div class=\"page-region page-header\">{}</div>\n<div class=\"page-region page-body\">{}</div>\n<div class=\"page-region page-footer\">{}</div>\n</div>",
        page.number,
        region(&page.header),
        region(&page.body),
        region(&page.footer)
    )
}

/// Standalone HTML document for all laid-out pages.
pub fn render_html(doc: &RenderedDocument) -> String {
    let page = &doc.page;
    let header = page.header_height;
    let body = page.body_height();
    let css = format!(
        r#"{fonts}
@page {{ size: {w} {h}; margin: 0; }}
body {{ margin: 0; }}
.page {{ position: relative; width: {w}; height: {h}; overflow: hidden; break-after: page; page-break-after: always; }}
.page:last-child {{ break-after: auto; page-break-after: auto; }}
.page-region {{ position: absolute; left: {left}; width: {bw}; }}
.page-header {{ top: {top}; height: {hh}; }}
.page-body {{ top: {body_top}; height: {bh}; }}
.page-footer {{ top: {footer_top}; height: {fh}; }}
.el {{ position: absolute; box-sizing: border-box; }}
.tbl {{ width: 100%; border-collapse: collapse; table-layout: fixed; }}
.tbl th, .tbl td {{ border: 1pt solid #E0E0E0; padding: 0pt 3pt; vertical-align: middle; box-sizing: border-box; overflow: hidden; }}"#,
        fonts = font_faces(&doc.fonts),
        w = pt(page.width),
        h = pt(page.height),
        left = pt(page.margin.left),
        bw = pt(page.body_width()),
        top = pt(page.margin.top),
        hh = pt(header),
        body_top = pt(page.margin.top + header),
        bh = pt(body),
        footer_top = pt(page.margin.top + header + body),
        fh = pt(page.footer_height),
    );
    let pages: Vec<String> = doc.pages.iter().map(|p| page_html(p, &doc.fonts)).collect();

    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\" />\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(&doc.name),
        css,
        pages.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, RenderOptions};
    use crate::template::Template;
    use serde_json::json;

    fn doc() -> RenderedDocument {
        let template = Template::from_value(json!({
            "name": "Invoice <A>",
            "page": {"width": 595, "height": 842, "margin": {"top": 36, "right": 36, "bottom": 36, "left": 36}},
            "fonts": [
                {"name": "Brand Sans", "source": "url", "url": "https://fonts.test/brand.woff2", "fallback": ["Arial", "sans-serif"]},
                {"name": "Arial"}
            ],
            "styles": {"defaultText": {"font": "Brand Sans", "size": 11}},
            "elements": [
                {"type": "text", "id": "t", "w": 100, "h": 20, "text": "a < b & {{who}}"},
                {"type": "text", "id": "r", "richText": true, "text": "<b>{{who}}</b>"},
                {"type": "qr", "id": "q", "w": 80, "h": 80, "value": "https://pay.test/1"},
                {"type": "line", "id": "l", "page": 2}
            ]
        }))
        .unwrap();
        Engine::new(template)
            .preview(&json!({"who": "Ada"}), RenderOptions::default())
            .unwrap()
    }

    #[test]
    fn test_font_css() {
        let d = doc();
        assert_eq!(
            font_family(&d.fonts, "Brand Sans"),
            "'Brand Sans', Arial, sans-serif"
        );
        assert_eq!(font_family(&d.fonts, "Unknown"), "Unknown");
        assert_eq!(
            font_faces(&d.fonts),
            "@font-face{font-family:\"Brand Sans\";src:url(\"https://fonts.test/brand.woff2\");font-display:swap;}"
        );
    }

    #[test]
    fn test_font_face_text_is_escaped() {
        let fonts = vec![Font {
            name: "Evil\"</style><script>".into(),
            source: FontSource::Url,
            url: Some("https://x.test/a\\b\".woff2".into()),
            ..Default::default()
        }];
        let css = font_faces(&fonts);
        assert!(!css.contains("</style>"));
        assert_eq!(
            css,
            "@font-face{font-family:\"Evil\\\"\\3c /style>\\3c script>\";src:url(\"https://x.test/a\\\\b\\\".woff2\");font-display:swap;}"
        );
    }

    #[test]
    fn test_html_structure() {
        let html = render_html(&doc());
        assert!(html.starts_with("<!doctype html>"));
        assert!(html.contains("<title>Invoice &lt;A&gt;</title>"));
        assert_eq!(html.matches("class=\"page\"").count(), 2);
        assert!(html.contains("@page { size: 595pt 842pt; margin: 0; }"));
        assert!(html.contains("break-after: page"));
        assert!(html.contains("a &lt; b &amp; Ada"));
        assert!(html.contains("<b>Ada</b>"));
        assert!(html.contains("<svg xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(html.contains("class=\"el line\""));
    }

    #[test]
    fn test_rasterizer_bytes() {
        let bytes = HtmlRasterizer.rasterize(&doc()).unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains("data-id=\"t\""));
        assert_eq!(HtmlRasterizer.content_type(), "text/html; charset=utf-8");
    }
}
