//! Reader for the datosmacro yearly CPI table

use scraper::{ElementRef, Html, Selector};

use crate::error::FetchError;
use crate::fetch::Fetch;
use crate::types::{Cell, CellKind, IpcTable};

const TABLE: &str = "table.tabledat";

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn cell_text(el: ElementRef) -> String {
    el.text()
        .collect::<String>()
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}

/// Header labels; the date column has a blank header and is called "Empty"
fn parse_header(table: ElementRef) -> Vec<String> {
    let Some(th) = selector("thead th") else {
        return Vec::new();
    };
    table
        .select(&th)
        .map(|h| {
            let label = cell_text(h);
            if label.chars().any(|c| c.is_alphanumeric()) {
                label
            } else {
                "Empty".to_string()
            }
        })
        .collect()
}

/// Body rows, keeping only date and numeric cells in column order
fn parse_body(table: ElementRef) -> Vec<Vec<Cell>> {
    let Some(tr) = selector("tbody tr") else {
        return Vec::new();
    };
    table
        .select(&tr)
        .map(|row| {
            row.children()
                .filter_map(ElementRef::wrap)
                .filter_map(|cell| {
                    // As written in the markup; `classes()` comes back sorted
                    let class = cell
                        .value()
                        .attr("class")
                        .and_then(|c| c.split_whitespace().next())
                        .unwrap_or_default();
                    match CellKind::from_class(class) {
                        CellKind::Decorative => None,
                        kind => Some(Cell::new(kind, cell_text(cell))),
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect()
}

/// Parse the CPI table out of a page, `None` when the page has no such table
pub fn parse_table(html: &str) -> Option<IpcTable> {
    let document = Html::parse_document(html);
    let table = document.select(&selector(TABLE)?).next()?;
    Some(IpcTable {
        header: parse_header(table),
        rows: parse_body(table),
    })
}

/// Fetch one CPI page and read its table
pub fn read_table(fetcher: &dyn Fetch, url: &str) -> Result<IpcTable, FetchError> {
    let html = fetcher.fetch(url)?;
    parse_table(&html).ok_or_else(|| FetchError::MissingTable {
        url: url.to_string(),
        selector: TABLE.to_string(),
    })
}

#[cfg(test)]
pub mod fixtures {
    /// A CPI page with one row per `(date, monthly variation)` pair
    pub fn page(rows: &[(&str, &str)]) -> String {
        let body: String = rows
            .iter()
            .map(|(date, monthly)| {
                format!(
                    r#"<tr><td class="fecha">{date}</td><td class="numero">1,4%</td><td class="numero">1,4%</td><td class="numero">{monthly}</td><td class="icon"><span>▲</span></td></tr>"#
                )
            })
            .collect();
        format!(
            r#"<html><body>
<table class="table tabledat table-striped table-condensed table-hover">
<thead><tr><th>&nbsp;</th><th>Interanual</th><th>Acumulado en el año</th><th>Variación mensual</th></tr></thead>
<tbody>{body}</tbody>
</table>
</body></html>"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::CannedPages;

    #[test]
    fn test_parse_table_header_and_kinds() {
        let html = fixtures::page(&[("Diciembre 2020", "0,1%"), ("Noviembre 2020", "-0,1%")]);
        let table = parse_table(&html).unwrap();

        assert_eq!(
            table.header,
            vec!["Empty", "Interanual", "Acumulado en el año", "Variación mensual"]
        );
        assert_eq!(table.rows.len(), 2);

        let row = &table.rows[1];
        assert_eq!(row.len(), 4);
        assert_eq!(row[0], Cell::new(CellKind::Date, "Noviembre 2020"));
        assert_eq!(row[3], Cell::new(CellKind::Numeric, "-0,1%"));
        assert!(row.iter().all(|c| c.kind != CellKind::Decorative));
    }

    #[test]
    fn test_kind_comes_from_first_written_class() {
        let html = r#"<table class="tabledat">
<thead><tr><th>&nbsp;</th><th>Variación mensual</th></tr></thead>
<tbody><tr>
<td class="fecha alt">Enero 2001</td>
<td class="icon numero">▲</td>
<td class="numero dato">0,6%</td>
</tr></tbody>
</table>"#;
        let table = parse_table(html).unwrap();

        assert_eq!(
            table.rows,
            vec![vec![
                Cell::new(CellKind::Date, "Enero 2001"),
                Cell::new(CellKind::Numeric, "0,6%"),
            ]]
        );
    }

    #[test]
    fn test_page_without_table() {
        assert!(parse_table("<html><body><p>No data</p></body></html>").is_none());

        let pages = CannedPages::default().with("http://ipc/", "<p>maintenance</p>");
        assert!(matches!(
            read_table(&pages, "http://ipc/"),
            Err(FetchError::MissingTable { .. })
        ));
    }

    #[test]
    fn test_read_table_propagates_fetch_error() {
        let pages = CannedPages::default();
        assert!(matches!(
            read_table(&pages, "http://ipc/?anio=1999"),
            Err(FetchError::NotFound(_))
        ));
    }
}
