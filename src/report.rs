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

//! Text rendering of a parsed map file. The report is built into a `String`
//! rather than printed piecemeal so tests can assert on it directly.

use std::fmt::Write;

use crate::parse::MapInfo;
use crate::sections::SectionKind;
use crate::symbols::AHB_POOL_END;

/// Render the full analysis report for one map file.
pub fn render_report(file_name: &str, info: &MapInfo) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n=== Analysis of {} ===", file_name);

    let _ = writeln!(out, "\nSection Sizes:");
    let _ = writeln!(
        out,
        "{:<15} {:<14} {:<12} {:<14}",
        "Section", "Start Address", "Size", "End Address"
    );
    let _ = writeln!(out, "{}", "-".repeat(60));
    // Sort by linker name for a stable, familiar ordering.
    let mut sections: Vec<_> = info.sections.iter().collect();
    sections.sort_by_key(|(kind, _)| kind.ld_name());
    for (kind, rec) in sections {
        let _ = writeln!(
            out,
            "{:<15} {:#010x} {:<12} {:#010x}",
            kind.ld_name(),
            rec.start,
            rec.size,
            rec.end()
        );
    }

    let _ = writeln!(out, "\nCritical Symbol Addresses:");
    let _ = writeln!(out, "{:<30} {:<14}", "Symbol", "Address");
    let _ = writeln!(out, "{}", "-".repeat(45));
    let mut symbols: Vec<_> = info.symbols.iter().collect();
    symbols.sort_by_key(|(_, addr)| **addr);
    for (name, addr) in symbols {
        let _ = writeln!(out, "{:<30} {:#010x}", name, addr);
    }

    if let Some(space) = info.heap_space() {
        let _ = writeln!(
            out,
            "\nEstimated Available Heap Space: {} bytes ({:.2} KB)",
            space,
            space as f64 / 1024.0
        );
    }

    if let Some(ahb) = info.section(SectionKind::AhbSram) {
        let _ = writeln!(out, "\nAHBSRAM Region:");
        let _ = writeln!(out, " Start  : {:#010x} (Static Start: __AHB_block_start)", ahb.start);
        let _ = writeln!(out, " Size   : {} bytes", ahb.size);
        let _ = writeln!(out, " End    : {:#010x} (Dynamic Start: __AHB_dyn_start)", ahb.end());

        if info.ahb_contribs.is_empty() {
            let _ = writeln!(
                out,
                "\n No detailed static contributions found within .AHBSRAM section in map."
            );
        } else {
            let _ = writeln!(out, "\n Statically allocated contributions in .AHBSRAM:");
            for contrib in &info.ahb_contribs {
                let _ = writeln!(
                    out,
                    "  Contribution: {} (Start: {:#010x}, Size: {} bytes)",
                    contrib.file_name, contrib.start, contrib.size
                );
                if !contrib.symbols.is_empty() {
                    let _ = writeln!(out, "    Symbols:");
                    let mut locals: Vec<_> = contrib.symbols.iter().collect();
                    locals.sort_by_key(|(_, addr)| **addr);
                    for (name, addr) in locals {
                        let _ = writeln!(out, "      {:<26} {:#010x}", name, addr);
                    }
                }
            }
        }

        if let Some(&pool_end) = info.symbols.get(AHB_POOL_END) {
            let _ = writeln!(out, " Pool End : {:#010x} ({})", pool_end, AHB_POOL_END);
            let pool_size = pool_end as i64 - ahb.end() as i64;
            let _ = writeln!(
                out,
                " Pool Size: {} bytes ({:.2} KB) <-- Area for MemoryPool",
                pool_size,
                pool_size as f64 / 1024.0
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_map;
    use crate::sections::SectionRecord;
    use crate::symbols::{BSS_END, STACK_TOP};

    #[test]
    fn empty_parse_renders_without_panicking() {
        let info = MapInfo::default();
        let report = render_report("empty.map", &info);
        assert!(report.contains("=== Analysis of empty.map ==="));
        assert!(report.contains("Section Sizes:"));
        assert!(report.contains("Critical Symbol Addresses:"));
        assert!(!report.contains("Estimated Available Heap Space"));
        assert!(!report.contains("AHBSRAM Region"));
    }

    #[test]
    fn heap_space_line_uses_bytes_and_kb() {
        let mut info = MapInfo::default();
        info.symbols.insert(BSS_END.to_string(), 0x20004000);
        info.symbols.insert(STACK_TOP.to_string(), 0x20008000);
        let report = render_report("fw.map", &info);
        assert!(report.contains("Estimated Available Heap Space: 16384 bytes (16.00 KB)"));
    }

    #[test]
    fn ahb_pool_summary_when_end_marker_present() {
        let mut info = MapInfo::default();
        info.sections.insert(SectionKind::AhbSram, SectionRecord::new(0x2007c000, 0x1000));
        info.symbols.insert(AHB_POOL_END.to_string(), 0x2007f000);
        let report = render_report("fw.map", &info);
        assert!(report.contains("AHBSRAM Region:"));
        assert!(report.contains(" End    : 0x2007d000"));
        assert!(report.contains(" Pool End : 0x2007f000"));
        // 0x2007f000 - 0x2007d000 = 8192
        assert!(report.contains(" Pool Size: 8192 bytes (8.00 KB)"));
    }

    #[test]
    fn symbols_are_listed_in_address_order() {
        let text = "\
Linker script and memory map

.text 0x0 0x100
                0x20008000                __StackTop
                0x20004000                __bss_end__
";
        let info = parse_map(text);
        let report = render_report("fw.map", &info);
        let bss = report.find("__bss_end__").expect("bss in report");
        let stack = report.find("__StackTop").expect("stack in report");
        assert!(bss < stack);
    }
}
