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

/// Critical symbols to look for, including toolchain/startup-file variations.
/// These bound heap and stack usage and are what we watch when comparing
/// builds for layout regressions.
pub const CRITICAL_SYMBOLS: [&str; 17] = [
    // End-of-BSS markers (heap grows up from here)
    "__bss_end__",
    "_end",
    "_ebss",
    "end",
    // Stack top markers (heap headroom ends here)
    "__StackTop",
    "_estack",
    "STACK_TOP",
    // Heap boundary bookkeeping
    "g_maximumHeapAddress",
    "_maxHeapAddr",
    // AHB SRAM region markers
    "__AHB_block_start",
    "__AHB_dyn_start",
    "__AHB_end",
    // Allocator entry points
    "MemoryPool::alloc",
    "MemoryPool::dealloc",
    "_sbrk",
    "doesHeapCollideWithStack",
    "_HeapCollideStackCheck",
];

/// Canonical end-of-BSS marker emitted by the GCC ARM startup files.
pub const BSS_END: &str = "__bss_end__";
/// Alternate end-of-BSS spelling used by newlib's `_sbrk`.
pub const BSS_END_ALT: &str = "_end";
/// Canonical stack-top marker.
pub const STACK_TOP: &str = "__StackTop";
/// End of the AHB SRAM pool reserved for MemoryPool.
pub const AHB_POOL_END: &str = "__AHB_end";

/// True when `name` is one of the critical symbols, or embeds one as a
/// substring. The substring arm catches decorated/prefixed spellings
/// (e.g. `.bss._end`), at the cost of occasional false positives for longer
/// identifiers that merely contain a critical name. The map grammar gives us
/// no way to disambiguate, so we accept that as a known limitation.
pub fn is_critical(name: &str) -> bool {
    CRITICAL_SYMBOLS.iter().any(|crit| name == *crit || name.contains(crit))
}

/// Parse a hex address token, with or without the `0x` prefix.
pub fn parse_hex(token: &str) -> Option<u64> {
    let trimmed = token.trim();
    let hex_str = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    u64::from_str_radix(hex_str, 16).ok()
}

/// True for tokens like `0x2007c000`. Used to reject hex literals that the
/// loose symbol patterns would otherwise pick up as names.
pub fn is_hex_literal(token: &str) -> bool {
    token
        .strip_prefix("0x")
        .map(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}
