// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Annotates CSV files with row/column counts and truncates beyond a
//! configurable row budget, replacing the tail with a summary line (spec
//! §4.5: "tabular truncation").

use async_trait::async_trait;
use copytree_domain::error::CopyTreeError;
use copytree_domain::file_record::FileContent;
use copytree_domain::transformer::{ContentType, Transformer, TransformerTraits};
use copytree_domain::value_objects::MetadataValue;
use copytree_domain::FileRecord;
use std::sync::OnceLock;

pub struct CsvTransformer {
    max_rows: usize,
}

impl Default for CsvTransformer {
    fn default() -> Self {
        Self { max_rows: 500 }
    }
}

impl CsvTransformer {
    pub fn with_max_rows(max_rows: usize) -> Self {
        Self { max_rows }
    }
}

fn traits() -> &'static TransformerTraits {
    static TRAITS: OnceLock<TransformerTraits> = OnceLock::new();
    TRAITS.get_or_init(|| TransformerTraits {
        input_types: vec![ContentType::Text],
        output_types: vec![ContentType::Text],
        tags: vec!["tabular".to_string()],
        ..Default::default()
    })
}

#[async_trait]
impl Transformer for CsvTransformer {
    fn name(&self) -> &str {
        "csv"
    }

    fn traits(&self) -> &TransformerTraits {
        traits()
    }

    fn can_transform(&self, file: &FileRecord) -> bool {
        file.is_binary() == Some(false) && file.relative_path().as_str().to_ascii_lowercase().ends_with(".csv")
    }

    async fn transform(&self, mut file: FileRecord) -> Result<FileRecord, CopyTreeError> {
        let Some(text) = file.content().as_text() else {
            return Ok(file);
        };
        let mut lines = text.lines();
        let header = lines.next().unwrap_or("");
        let column_count = header.split(',').count();
        let data_rows: Vec<&str> = lines.collect();
        let row_count = data_rows.len();

        let body = if row_count > self.max_rows {
            let mut truncated = String::new();
            truncated.push_str(header);
            truncated.push('\n');
            for row in &data_rows[..self.max_rows] {
                truncated.push_str(row);
                truncated.push('\n');
            }
            truncated.push_str(&format!("... truncated {} of {row_count} rows ...\n", row_count - self.max_rows));
            truncated
        } else {
            text.to_string()
        };

        file.insert_metadata("csv.rowCount", MetadataValue::Integer(row_count as i64));
        file.insert_metadata("csv.columnCount", MetadataValue::Integer(column_count as i64));
        file = file.with_content(FileContent::Text(body), false, Some("utf-8".to_string()));
        file.mark_transformed(self.name());
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copytree_domain::value_objects::RelativePath;
    use std::path::PathBuf;

    fn file_with(content: &str) -> FileRecord {
        FileRecord::discovered(RelativePath::new("data.csv").unwrap(), PathBuf::from("data.csv"), content.len() as u64, None)
            .with_content(FileContent::Text(content.to_string()), false, Some("utf-8".to_string()))
    }

    #[tokio::test]
    async fn truncates_beyond_max_rows_and_records_counts() {
        let mut content = String::from("a,b,c\n");
        for i in 0..10 {
            content.push_str(&format!("{i},{i},{i}\n"));
        }
        let transformer = CsvTransformer::with_max_rows(3);
        let out = transformer.transform(file_with(&content)).await.unwrap();
        let text = out.content().as_text().unwrap();
        assert!(text.contains("truncated 7 of 10 rows"));
        assert_eq!(out.metadata().get("csv.rowCount").unwrap().as_integer(), Some(10));
        assert_eq!(out.metadata().get("csv.columnCount").unwrap().as_integer(), Some(3));
    }

    #[tokio::test]
    async fn leaves_short_files_untouched() {
        let content = "a,b\n1,2\n";
        let transformer = CsvTransformer::default();
        let out = transformer.transform(file_with(content)).await.unwrap();
        assert_eq!(out.content().as_text().unwrap(), content);
    }
}
