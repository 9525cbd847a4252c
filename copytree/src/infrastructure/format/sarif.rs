// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A minimal SARIF log carrying secret-scan findings as results (spec
//! §4.6, §4.9). Produced under the `report-only` secrets policy, or
//! whenever `--format sarif` is requested directly; file contents are not
//! part of a SARIF artifact, so `file_chunk` contributes nothing.

use super::{FormatWriter, RenderContext};
use copytree_domain::FileRecord;
use serde_json::json;

pub struct SarifWriter;

impl FormatWriter for SarifWriter {
    fn prologue(&self, _files: &[FileRecord], ctx: &RenderContext) -> String {
        let results: Vec<_> = ctx
            .secret_findings
            .iter()
            .map(|f| {
                json!({
                    "ruleId": f.rule_id,
                    "message": { "text": format!("potential secret matched by rule '{}'", f.rule_id) },
                    "locations": [{
                        "physicalLocation": {
                            "region": {
                                "startLine": f.start_line,
                                "endLine": f.end_line,
                                "startColumn": f.start_column,
                                "endColumn": f.end_column,
                            }
                        }
                    }],
                    "properties": { "tags": f.tags },
                })
            })
            .collect();

        let log = json!({
            "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
            "version": "2.1.0",
            "runs": [{
                "tool": { "driver": { "name": "copytree", "informationUri": "https://github.com/abitofhelp/copytree" } },
                "results": results,
            }],
        });
        serde_json::to_string_pretty(&log).unwrap_or_default()
    }

    fn file_chunk(&self, _file: &FileRecord, _index: usize, _ctx: &RenderContext) -> String {
        String::new()
    }

    fn epilogue(&self, _files: &[FileRecord], _ctx: &RenderContext) -> String {
        String::new()
    }
}
