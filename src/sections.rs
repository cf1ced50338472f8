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

use serde_json::{json, Value};

/// The sections we care about when judging memory layout. This is a closed
/// set: detection is keyed on the exact linker names, so anything the linker
/// script renames will simply not be picked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKind {
    Text,
    Data,
    Bss,
    Heap,
    Stack,
    StackDummy,
    /// LPC17xx AHB SRAM bank, used for DMA buffers and the MemoryPool arena.
    AhbSram,
}

impl SectionKind {
    pub const ALL: [SectionKind; 7] = [
        SectionKind::Text,
        SectionKind::Data,
        SectionKind::Bss,
        SectionKind::Heap,
        SectionKind::Stack,
        SectionKind::StackDummy,
        SectionKind::AhbSram,
    ];

    /// Section name as it appears in the map file (leading dot included).
    pub fn ld_name(self) -> &'static str {
        match self {
            SectionKind::Text => ".text",
            SectionKind::Data => ".data",
            SectionKind::Bss => ".bss",
            SectionKind::Heap => ".heap",
            SectionKind::Stack => ".stack",
            SectionKind::StackDummy => ".stack_dummy",
            SectionKind::AhbSram => ".AHBSRAM",
        }
    }

    /// Name without the leading dot, for loose containment matching inside
    /// the Memory Configuration block.
    pub fn bare_name(self) -> &'static str {
        &self.ld_name()[1..]
    }

    pub fn from_ld_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.ld_name() == name)
    }
}

/// Start/size of one section as recorded in the map file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionRecord {
    pub start: u64,
    pub size: u64,
}

impl SectionRecord {
    pub fn new(start: u64, size: u64) -> Self {
        Self { start, size }
    }

    pub fn end(&self) -> u64 {
        self.start + self.size
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "start": format!("{:#x}", self.start),
            "size": self.size,
            "end": format!("{:#x}", self.end()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ld_names_round_trip() {
        for kind in SectionKind::ALL {
            assert_eq!(SectionKind::from_ld_name(kind.ld_name()), Some(kind));
        }
        assert_eq!(SectionKind::from_ld_name(".rodata"), None);
    }

    #[test]
    fn record_end_and_contains() {
        let rec = SectionRecord::new(0x2007c000, 0x1000);
        assert_eq!(rec.end(), 0x2007d000);
        assert!(rec.contains(0x2007c000));
        assert!(rec.contains(0x2007cfff));
        assert!(!rec.contains(0x2007d000));
    }
}
