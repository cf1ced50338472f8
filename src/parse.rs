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

//! Heuristic extraction of section boundaries and critical symbol addresses
//! from GNU ld map files.
//!
//! The map format is not specified by its producer and drifts across
//! toolchain versions, so parsing runs as an ordered cascade of independent
//! stages over the same text. Each stage may overwrite what an earlier stage
//! found; later parts of a map file (symbol table, cross reference table) are
//! more authoritative than the loose pattern matches near the top. Nothing
//! here fails on unexpected input: a token that does not parse is dropped and
//! scanning moves on.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;
use serde_json::{json, Value};

use crate::sections::{SectionKind, SectionRecord};
use crate::symbols::{is_critical, is_hex_literal, parse_hex, CRITICAL_SYMBOLS};

/// Linker script directives that the bare `addr name` pattern would otherwise
/// mistake for symbol names.
const LINKER_KEYWORDS: [&str; 1] = ["PROVIDE"];

/// One object file's statically allocated block inside the AHB SRAM section,
/// with the symbols the linker placed in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectContribution {
    pub file_name: String,
    pub start: u64,
    pub size: u64,
    pub symbols: BTreeMap<String, u64>,
}

impl ObjectContribution {
    pub fn to_json(&self) -> Value {
        json!({
            "file": self.file_name,
            "start": format!("{:#x}", self.start),
            "size": self.size,
            "symbols": self
                .symbols
                .iter()
                .map(|(name, addr)| (name.clone(), json!(format!("{:#x}", addr))))
                .collect::<serde_json::Map<String, Value>>(),
        })
    }
}

/// Everything extracted from one map file. Built fresh per invocation and
/// never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapInfo {
    pub sections: BTreeMap<SectionKind, SectionRecord>,
    /// Critical symbol name (or the matched allow-list entry) to address.
    pub symbols: BTreeMap<String, u64>,
    /// Per-object contributions inside .AHBSRAM, in map-file order.
    pub ahb_contribs: Vec<ObjectContribution>,
}

impl MapInfo {
    pub fn section(&self, kind: SectionKind) -> Option<&SectionRecord> {
        self.sections.get(&kind)
    }

    /// Headroom between the end of BSS and the bottom of the stack; this is
    /// what `_sbrk` has to work with. Negative means the linker already placed
    /// them overlapping.
    pub fn heap_space(&self) -> Option<i64> {
        let bss_end = *self.symbols.get(crate::symbols::BSS_END)?;
        let stack_top = *self.symbols.get(crate::symbols::STACK_TOP)?;
        Some(stack_top as i64 - bss_end as i64)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "sections": self
                .sections
                .iter()
                .map(|(kind, rec)| (kind.ld_name().to_string(), rec.to_json()))
                .collect::<serde_json::Map<String, Value>>(),
            "symbols": self
                .symbols
                .iter()
                .map(|(name, addr)| (name.clone(), json!(format!("{:#x}", addr))))
                .collect::<serde_json::Map<String, Value>>(),
            "ahbsram_contributions": self
                .ahb_contribs
                .iter()
                .map(ObjectContribution::to_json)
                .collect::<Vec<Value>>(),
            "heap_space": self.heap_space(),
        })
    }
}

/// Parse a map file's text. Never fails: absent patterns yield an empty or
/// partial result.
pub fn parse_map(text: &str) -> MapInfo {
    let mut info = MapInfo::default();
    scan_section_headers(text, &mut info);
    scan_memory_configuration(text, &mut info);
    scan_linker_map(text, &mut info);
    scan_symbol_table(text, &mut info);
    scan_cross_reference(text, &mut info);
    info
}

fn hex_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"0x[0-9a-fA-F]+").unwrap())
}

fn section_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\.[\w._]+)\s+(0x[0-9a-fA-F]+)\s+(0x[0-9a-fA-F]+)").unwrap()
    })
}

// Example: AHBSRAM        0x2007c200      0x2e0 ../LPC1768/./main.o
fn contribution_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*[\w.]+\s+(0x[0-9a-fA-F]+)\s+(0x[0-9a-fA-F]+)\s+(.*\.o)\s*$").unwrap()
    })
}

// Example: 0x2007d4e0                xbuff
fn bare_symbol_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(0x[0-9a-fA-F]+)\s+([\w:]+)\s*$").unwrap())
}

fn addr_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(0x[0-9a-fA-F]+)\s+([A-Za-z0-9_:]+)").unwrap())
}

fn memory_config_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)Memory Configuration.*?\n\n(.*?)\n\n").unwrap())
}

fn linker_map_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)Linker script and memory map.*?\n\n(.*)").unwrap())
}

fn symbol_table_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)SYMBOL TABLE:.*?\n(.*?)(?:\n\n|\z)").unwrap())
}

fn cross_reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)Cross Reference Table.*?\n\n(.*?)(?:\n\n|\z)").unwrap())
}

fn capture_block<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn is_linker_keyword(name: &str) -> bool {
    LINKER_KEYWORDS.iter().any(|kw| name.eq_ignore_ascii_case(kw))
}

/// Stage 1: direct `<name> <start> <size>` matches anywhere in the text.
fn scan_section_headers(text: &str, info: &mut MapInfo) {
    for kind in SectionKind::ALL {
        let pattern = format!(
            r"{}\s+(0x[0-9a-fA-F]+)\s+(0x[0-9a-fA-F]+)",
            regex::escape(kind.ld_name())
        );
        let re = Regex::new(&pattern).unwrap();
        if let Some(caps) = re.captures(text) {
            if let (Some(start), Some(size)) = (parse_hex(&caps[1]), parse_hex(&caps[2])) {
                debug!("section header: {} start={:#x} size={:#x}", kind.ld_name(), start, size);
                info.sections.insert(kind, SectionRecord::new(start, size));
            }
        }
    }
}

/// Stage 2: the "Memory Configuration" block. Loose containment match per
/// line, first two hex tokens taken as start/size.
fn scan_memory_configuration(text: &str, info: &mut MapInfo) {
    let Some(block) = capture_block(memory_config_re(), text) else {
        return;
    };
    for line in block.lines() {
        if line.trim().is_empty() {
            continue;
        }
        for kind in SectionKind::ALL {
            if line.contains(kind.bare_name()) {
                let tokens: Vec<u64> = hex_token_re()
                    .find_iter(line)
                    .filter_map(|m| parse_hex(m.as_str()))
                    .collect();
                if tokens.len() >= 2 {
                    debug!(
                        "memory configuration: {} start={:#x} size={:#x}",
                        kind.ld_name(),
                        tokens[0],
                        tokens[1]
                    );
                    info.sections.insert(kind, SectionRecord::new(tokens[0], tokens[1]));
                }
            }
        }
    }
}

/// Scan state for the "Linker script and memory map" block. The .AHBSRAM
/// branch needs to know which object contribution an indented `addr name`
/// line belongs to; everything else only needs to know a section is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Before the first section header.
    Idle,
    /// Inside a section other than .AHBSRAM.
    InSection,
    /// Inside .AHBSRAM; `active` indexes the contribution currently being
    /// filled, if any.
    InAhbSram { active: Option<usize> },
}

/// Stage 3: the "Linker script and memory map" block. Stateful line scan;
/// records important sections, AHB SRAM object contributions, and any
/// critical symbols it runs across.
fn scan_linker_map(text: &str, info: &mut MapInfo) {
    let Some(block) = capture_block(linker_map_re(), text) else {
        return;
    };

    let mut state = ScanState::Idle;
    for line in block.lines() {
        // Section header opens a new section and drops any contribution
        // tracking from the previous one.
        if let Some(caps) = section_header_re().captures(line) {
            let name = caps[1].to_string();
            if let Some(kind) = SectionKind::from_ld_name(&name) {
                if let (Some(start), Some(size)) = (parse_hex(&caps[2]), parse_hex(&caps[3])) {
                    debug!("linker map: {} start={:#x} size={:#x}", name, start, size);
                    info.sections.insert(kind, SectionRecord::new(start, size));
                }
            }
            state = if name == SectionKind::AhbSram.ld_name() {
                ScanState::InAhbSram { active: None }
            } else {
                ScanState::InSection
            };
            continue;
        }

        if let ScanState::InAhbSram { active } = state {
            // New object contribution, e.g.
            //   AHBSRAM        0x2007c200      0x2e0 ../LPC1768/./main.o
            if let Some(caps) = contribution_re().captures(line) {
                if let (Some(start), Some(size)) = (parse_hex(&caps[1]), parse_hex(&caps[2])) {
                    debug!("ahbsram contribution: {} start={:#x} size={}", &caps[3], start, size);
                    info.ahb_contribs.push(ObjectContribution {
                        file_name: caps[3].trim().to_string(),
                        start,
                        size,
                        symbols: BTreeMap::new(),
                    });
                    state = ScanState::InAhbSram {
                        active: Some(info.ahb_contribs.len() - 1),
                    };
                }
                continue;
            }

            // Bare `addr name` line belongs to the open contribution.
            if let Some(caps) = bare_symbol_re().captures(line) {
                let name = &caps[2];
                if !is_hex_literal(name) && !is_linker_keyword(name) {
                    if let (Some(idx), Some(addr)) = (active, parse_hex(&caps[1])) {
                        info.ahb_contribs[idx].symbols.insert(name.to_string(), addr);
                    }
                }
                continue;
            }

            // Anything else ends attribution: a later bare symbol line must
            // not land in the previous contribution.
            state = ScanState::InAhbSram { active: None };
        }

        // Critical symbol as an `addr name` pair (GCC ARM layout).
        if let Some(caps) = addr_name_re().captures(line) {
            let name = &caps[2];
            if is_critical(name) {
                if let Some(addr) = parse_hex(&caps[1]) {
                    debug!("linker map symbol: {} = {:#x}", name, addr);
                    info.symbols.insert(name.to_string(), addr);
                }
                continue;
            }
        }

        // Critical name buried mid-line, e.g.
        //   .bss._end  0x20007960  0x0 .../libc.a(lib_a-sbrkr.o)
        // Take the first hex token on the line as its address.
        for crit in CRITICAL_SYMBOLS {
            if line.contains(crit) {
                if let Some(m) = hex_token_re().find(line) {
                    if let Some(addr) = parse_hex(m.as_str()) {
                        debug!("linker map symbol (substring): {} = {:#x}", crit, addr);
                        info.symbols.insert(crit.to_string(), addr);
                    }
                }
            }
        }
    }
}

/// Stage 4: an objdump-style "SYMBOL TABLE" block, if the map was
/// post-processed to include one. First token is the address, last token the
/// symbol name. Overwrites earlier findings.
fn scan_symbol_table(text: &str, info: &mut MapInfo) {
    let Some(block) = capture_block(symbol_table_re(), text) else {
        return;
    };
    for line in block.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }
        if !parts[0].starts_with("0x") {
            continue;
        }
        let name = parts[parts.len() - 1];
        if is_critical(name) {
            if let Some(addr) = parse_hex(parts[0]) {
                debug!("symbol table: {} = {:#x}", name, addr);
                info.symbols.insert(name.to_string(), addr);
            }
        }
    }
}

/// Stage 5: the "Cross Reference Table" block. Any line containing a critical
/// name contributes its first hex token. Overwrites earlier findings.
fn scan_cross_reference(text: &str, info: &mut MapInfo) {
    let Some(block) = capture_block(cross_reference_re(), text) else {
        return;
    };
    for line in block.lines() {
        for crit in CRITICAL_SYMBOLS {
            if line.contains(crit) {
                if let Some(m) = hex_token_re().find(line) {
                    if let Some(addr) = parse_hex(m.as_str()) {
                        debug!("cross reference: {} = {:#x}", crit, addr);
                        info.symbols.insert(crit.to_string(), addr);
                    }
                }
            }
        }
    }
}
