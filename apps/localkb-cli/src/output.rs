use localkb_core::types::RetrievalHit;

/// Split a comma-separated namespace list, dropping blank entries.
pub fn parse_namespaces(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

/// Plain-text table of `#`, fused score, heading and source.
pub fn render_results_table(hits: &[RetrievalHit]) -> String {
    let rows: Vec<[String; 4]> = hits
        .iter()
        .enumerate()
        .map(|(i, h)| {
            [
                (i + 1).to_string(),
                format!("{:.4}", h.fused_score),
                h.chunk.heading.clone(),
                h.chunk.source_path.clone(),
            ]
        })
        .collect();
    let header = ["#", "Score", "Heading", "Source"].map(String::from);
    let mut widths = header.clone().map(|h| h.chars().count());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::from("KB Query Results\n");
    for row in std::iter::once(&header).chain(rows.iter()) {
        let cells: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    if rows.is_empty() {
        out.push_str("(no results)\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use localkb_core::types::Chunk;

    #[test]
    fn namespaces_drop_blanks() {
        assert_eq!(parse_namespaces(" domain, ,project,"), vec!["domain", "project"]);
        assert!(parse_namespaces("  ").is_empty());
    }

    #[test]
    fn table_formats_scores_to_four_places() {
        let hit = RetrievalHit {
            fused_score: 1.0 / 61.0,
            chunk: Chunk {
                chunk_id: "abc".into(),
                source_path: "domain/a.md".into(),
                heading: "Guide".into(),
                content: "x".into(),
                namespace: "domain".into(),
            },
            vec_rank: None,
            bm25_rank: Some(1),
        };
        let table = render_results_table(&[hit]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "KB Query Results");
        assert_eq!(lines[1], "#  Score   Heading  Source");
        assert_eq!(lines[2], "1  0.0164  Guide    domain/a.md");
    }

    #[test]
    fn empty_table_says_so() {
        assert!(render_results_table(&[]).ends_with("(no results)\n"));
    }
}
