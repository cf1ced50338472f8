// Copyright (c) 2026 LinkMap Analyzer Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Build-to-build comparison. The delta is computed into plain data first so
//! the hazard checks are testable without capturing stdout, then rendered.

use std::collections::BTreeSet;
use std::fmt::Write;

use serde_json::{json, Value};

use crate::parse::MapInfo;
use crate::sections::SectionKind;
use crate::symbols::{BSS_END, BSS_END_ALT, STACK_TOP};

#[derive(Debug, Clone, PartialEq)]
pub struct SectionDelta {
    pub kind: SectionKind,
    pub size_a: u64,
    pub size_b: u64,
    pub diff: i64,
    /// None when the baseline size is zero (percent change undefined).
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolDelta {
    pub name: String,
    pub addr_a: u64,
    pub addr_b: u64,
    pub diff: i64,
    /// Set when the movement shrinks heap headroom.
    pub warning: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapDelta {
    pub space_a: i64,
    pub space_b: i64,
    pub diff: i64,
}

/// Result of comparing build A (baseline) against build B.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildDelta {
    pub sections: Vec<SectionDelta>,
    pub symbols: Vec<SymbolDelta>,
    /// Present only when both builds expose both heap-bound symbols.
    pub heap: Option<HeapDelta>,
}

impl BuildDelta {
    pub fn heap_shrank(&self) -> bool {
        self.heap.map(|h| h.diff < 0).unwrap_or(false)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "sections": self.sections.iter().map(|s| json!({
                "section": s.kind.ld_name(),
                "size_a": s.size_a,
                "size_b": s.size_b,
                "diff": s.diff,
                "percent": s.percent,
            })).collect::<Vec<Value>>(),
            "symbols": self.symbols.iter().map(|s| json!({
                "symbol": s.name,
                "addr_a": format!("{:#x}", s.addr_a),
                "addr_b": format!("{:#x}", s.addr_b),
                "diff": s.diff,
                "warning": s.warning,
            })).collect::<Vec<Value>>(),
            "heap": self.heap.map(|h| json!({
                "space_a": h.space_a,
                "space_b": h.space_b,
                "diff": h.diff,
                "shrank": h.diff < 0,
            })),
        })
    }
}

fn symbol_warning(name: &str, diff: i64) -> Option<&'static str> {
    if (name == BSS_END || name == BSS_END_ALT) && diff > 0 {
        return Some("Higher end of BSS reduces heap space");
    }
    if name == STACK_TOP && diff < 0 {
        return Some("Lower stack top reduces heap space");
    }
    None
}

/// Compare two parsed builds. Missing sections count as size 0; missing
/// symbol addresses count as 0, so a symbol appearing or disappearing shows
/// up as a large delta rather than being dropped from the table.
pub fn compare_builds(build_a: &MapInfo, build_b: &MapInfo) -> BuildDelta {
    let section_kinds: BTreeSet<SectionKind> = build_a
        .sections
        .keys()
        .chain(build_b.sections.keys())
        .copied()
        .collect();

    let mut sections = Vec::new();
    for kind in section_kinds {
        let size_a = build_a.section(kind).map(|r| r.size).unwrap_or(0);
        let size_b = build_b.section(kind).map(|r| r.size).unwrap_or(0);
        let diff = size_b as i64 - size_a as i64;
        let percent = if size_a > 0 {
            Some(diff as f64 / size_a as f64 * 100.0)
        } else {
            None
        };
        sections.push(SectionDelta { kind, size_a, size_b, diff, percent });
    }

    let symbol_names: BTreeSet<&String> =
        build_a.symbols.keys().chain(build_b.symbols.keys()).collect();

    let mut symbols = Vec::new();
    for name in symbol_names {
        let addr_a = build_a.symbols.get(name).copied().unwrap_or(0);
        let addr_b = build_b.symbols.get(name).copied().unwrap_or(0);
        let diff = addr_b as i64 - addr_a as i64;
        symbols.push(SymbolDelta {
            name: name.clone(),
            addr_a,
            addr_b,
            diff,
            warning: symbol_warning(name, diff),
        });
    }

    let heap = match (build_a.heap_space(), build_b.heap_space()) {
        (Some(space_a), Some(space_b)) => Some(HeapDelta {
            space_a,
            space_b,
            diff: space_b - space_a,
        }),
        _ => None,
    };

    BuildDelta { sections, symbols, heap }
}

/// Render the comparison report.
pub fn render_comparison(delta: &BuildDelta) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n=== COMPARISON RESULTS ===");

    let _ = writeln!(out, "\nSection Size Comparison:");
    let _ = writeln!(
        out,
        "{:<15} {:<12} {:<12} {:<12} {:<10}",
        "Section", "Build A", "Build B", "Difference", "% Change"
    );
    let _ = writeln!(out, "{}", "-".repeat(60));
    let mut sections: Vec<_> = delta.sections.iter().collect();
    sections.sort_by_key(|s| s.kind.ld_name());
    for s in sections {
        let percent_str = match s.percent {
            Some(p) => format!("{:.2}%", p),
            None => "N/A".to_string(),
        };
        let _ = writeln!(
            out,
            "{:<15} {:<12} {:<12} {:<+12} {:<10}",
            s.kind.ld_name(),
            s.size_a,
            s.size_b,
            s.diff,
            percent_str
        );
    }

    let _ = writeln!(out, "\nCritical Symbol Address Comparison:");
    let _ = writeln!(
        out,
        "{:<30} {:<12} {:<12} {:<12}",
        "Symbol", "Build A", "Build B", "Difference"
    );
    let _ = writeln!(out, "{}", "-".repeat(70));
    for s in &delta.symbols {
        let status = match s.warning {
            Some(w) => format!(" [WARN: {}]", w),
            None => String::new(),
        };
        let _ = writeln!(
            out,
            "{:<30} {:#010x} {:#010x} {:<+12}{}",
            s.name, s.addr_a, s.addr_b, s.diff, status
        );
    }

    if let Some(heap) = delta.heap {
        let _ = writeln!(out, "\nEstimated Available Heap Space:");
        let _ = writeln!(
            out,
            "Build A: {} bytes ({:.2} KB)",
            heap.space_a,
            heap.space_a as f64 / 1024.0
        );
        let _ = writeln!(
            out,
            "Build B: {} bytes ({:.2} KB)",
            heap.space_b,
            heap.space_b as f64 / 1024.0
        );
        let _ = writeln!(
            out,
            "Difference: {:+} bytes ({:.2} KB)",
            heap.diff,
            heap.diff as f64 / 1024.0
        );

        if heap.diff < 0 {
            let _ = writeln!(out, "\n[WARNING] Available heap space decreased in Build B!");
            let _ = writeln!(out, "This could explain heap/stack collision issues.");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::SectionRecord;

    fn build(bss_end: u64, stack_top: u64) -> MapInfo {
        let mut info = MapInfo::default();
        info.symbols.insert(BSS_END.to_string(), bss_end);
        info.symbols.insert(STACK_TOP.to_string(), stack_top);
        info
    }

    #[test]
    fn bss_growth_warns_and_heap_shrinks() {
        let a = build(0x1000, 0x9000);
        let b = build(0x1800, 0x9000);
        let delta = compare_builds(&a, &b);

        let bss = delta.symbols.iter().find(|s| s.name == BSS_END).expect("bss delta");
        assert_eq!(bss.diff, 0x800);
        assert!(bss.warning.is_some());

        let heap = delta.heap.expect("both builds have heap symbols");
        assert_eq!(heap.diff, -0x800);
        assert!(delta.heap_shrank());

        let report = render_comparison(&delta);
        assert!(report.contains("[WARN: Higher end of BSS reduces heap space]"));
        assert!(report.contains("[WARNING] Available heap space decreased in Build B!"));
    }

    #[test]
    fn lower_stack_top_warns() {
        let a = build(0x1000, 0x9000);
        let b = build(0x1000, 0x8000);
        let delta = compare_builds(&a, &b);
        let stack = delta.symbols.iter().find(|s| s.name == STACK_TOP).expect("stack delta");
        assert_eq!(stack.diff, -0x1000);
        assert_eq!(stack.warning, Some("Lower stack top reduces heap space"));
    }

    #[test]
    fn growth_in_the_right_direction_does_not_warn() {
        let a = build(0x1800, 0x8000);
        let b = build(0x1000, 0x9000);
        let delta = compare_builds(&a, &b);
        assert!(delta.symbols.iter().all(|s| s.warning.is_none()));
        assert!(!delta.heap_shrank());
    }

    #[test]
    fn zero_baseline_size_reports_percent_as_not_applicable() {
        let a = MapInfo::default();
        let mut b = MapInfo::default();
        b.sections.insert(SectionKind::Data, SectionRecord::new(0x10000000, 100));
        let delta = compare_builds(&a, &b);

        let data = delta.sections.iter().find(|s| s.kind == SectionKind::Data).expect("data");
        assert_eq!(data.size_a, 0);
        assert_eq!(data.size_b, 100);
        assert_eq!(data.percent, None);

        let report = render_comparison(&delta);
        assert!(report.contains("N/A"));
    }

    #[test]
    fn heap_delta_absent_when_a_symbol_is_missing() {
        let a = build(0x1000, 0x9000);
        let mut b = MapInfo::default();
        b.symbols.insert(BSS_END.to_string(), 0x1000);
        let delta = compare_builds(&a, &b);
        assert!(delta.heap.is_none());
        // The missing __StackTop still shows in the symbol table as 0.
        let stack = delta.symbols.iter().find(|s| s.name == STACK_TOP).expect("stack row");
        assert_eq!(stack.addr_b, 0);
    }
}
