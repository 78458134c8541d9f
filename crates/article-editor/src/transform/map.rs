// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Position maps. A [`StepMap`] describes how one step moved positions; a
//! [`Mapping`] chains many of them. Mirrored pairs in a mapping (a step and
//! its rebased inverse) let positions inside content that was removed and
//! re-added recover their original offset instead of collapsing.

const DEL_BEFORE: u8 = 1;
const DEL_AFTER: u8 = 2;
const DEL_ACROSS: u8 = 4;
const DEL_SIDE: u8 = 8;

const RECOVER_FACTOR: usize = 1 << 16;

fn make_recover(index: usize, offset: usize) -> usize {
    index + offset * RECOVER_FACTOR
}

fn recover_index(value: usize) -> usize {
    value % RECOVER_FACTOR
}

fn recover_offset(value: usize) -> usize {
    value / RECOVER_FACTOR
}

/// Which side a position sticks to when content is inserted exactly there.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assoc {
    Before,
    After,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    del_info: u8,
    recover: Option<usize>,
}

impl MapResult {
    /// The position's own side was deleted.
    pub fn deleted(&self) -> bool {
        self.del_info & DEL_SIDE > 0
    }

    pub fn deleted_before(&self) -> bool {
        self.del_info & (DEL_BEFORE | DEL_ACROSS) > 0
    }

    pub fn deleted_after(&self) -> bool {
        self.del_info & (DEL_AFTER | DEL_ACROSS) > 0
    }

    pub fn deleted_across(&self) -> bool {
        self.del_info & DEL_ACROSS > 0
    }
}

/// A changed range: `old` positions starting at `start` became `new` ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapRange {
    pub start: usize,
    pub old: usize,
    pub new: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepMap {
    ranges: Vec<MapRange>,
    inverted: bool,
}

impl StepMap {
    pub fn new(ranges: Vec<MapRange>) -> Self {
        Self {
            ranges,
            inverted: false,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(start: usize, old: usize, new: usize) -> Self {
        Self::new(vec![MapRange { start, old, new }])
    }

    pub fn invert(&self) -> Self {
        Self {
            ranges: self.ranges.clone(),
            inverted: !self.inverted,
        }
    }

    fn sizes(&self, range: &MapRange) -> (usize, usize) {
        if self.inverted {
            (range.new, range.old)
        } else {
            (range.old, range.new)
        }
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut diff: isize = 0;
        for (i, range) in self.ranges.iter().enumerate() {
            let start = if self.inverted {
                (range.start as isize - diff) as usize
            } else {
                range.start
            };
            if start > pos {
                break;
            }
            let (old_size, new_size) = self.sizes(range);
            let end = start + old_size;
            if pos <= end {
                let before = if old_size == 0 {
                    assoc == Assoc::Before
                } else if pos == start {
                    true
                } else if pos == end {
                    false
                } else {
                    assoc == Assoc::Before
                };
                let base = (start as isize + diff) as usize;
                let mapped = if before { base } else { base + new_size };
                let edge = if assoc == Assoc::Before { start } else { end };
                let recover = if pos == edge {
                    None
                } else {
                    Some(make_recover(i, pos - start))
                };
                let mut del_info = if pos == start {
                    DEL_AFTER
                } else if pos == end {
                    DEL_BEFORE
                } else {
                    DEL_ACROSS
                };
                if pos != edge {
                    del_info |= DEL_SIDE;
                }
                return MapResult {
                    pos: mapped,
                    del_info,
                    recover,
                };
            }
            diff += new_size as isize - old_size as isize;
        }
        MapResult {
            pos: (pos as isize + diff) as usize,
            del_info: 0,
            recover: None,
        }
    }

    fn recover(&self, value: usize) -> usize {
        let index = recover_index(value);
        let mut diff: isize = 0;
        if !self.inverted {
            for range in self.ranges.iter().take(index) {
                diff += range.new as isize - range.old as isize;
            }
        }
        let start = self.ranges.get(index).map(|r| r.start).unwrap_or(0);
        (start as isize + diff) as usize + recover_offset(value)
    }

    /// Call `f(old_start, old_end, new_start, new_end)` for each range.
    pub fn for_each(&self, mut f: impl FnMut(usize, usize, usize, usize)) {
        let mut diff: isize = 0;
        for range in &self.ranges {
            let (old_size, new_size) = self.sizes(range);
            let start = if self.inverted {
                (range.start as isize - diff) as usize
            } else {
                range.start
            };
            let new_start = (start as isize + diff) as usize;
            f(start, start + old_size, new_start, new_start + new_size);
            diff += new_size as isize - old_size as isize;
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Mapping {
    maps: Vec<StepMap>,
    mirror: Vec<(usize, usize)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// The sub-mapping starting at map `from`.
    pub fn slice(&self, from: usize) -> Mapping {
        let maps = self.maps[from.min(self.maps.len())..].to_vec();
        let mirror = self
            .mirror
            .iter()
            .filter(|(a, b)| *a >= from && *b >= from)
            .map(|(a, b)| (a - from, b - from))
            .collect();
        Mapping { maps, mirror }
    }

    pub fn append_map(&mut self, map: StepMap, mirrors: Option<usize>) {
        self.maps.push(map);
        if let Some(m) = mirrors {
            self.set_mirror(self.maps.len() - 1, m);
        }
    }

    pub fn append_mapping(&mut self, other: &Mapping) {
        let start = self.maps.len();
        for (i, map) in other.maps.iter().enumerate() {
            let mirror = other.get_mirror(i).filter(|m| *m < i).map(|m| start + m);
            self.append_map(map.clone(), mirror);
        }
    }

    /// Append the inverse of `other`, last map first.
    pub fn append_mapping_inverted(&mut self, other: &Mapping) {
        let total = self.maps.len() + other.maps.len();
        for i in (0..other.maps.len()).rev() {
            let mirror = other
                .get_mirror(i)
                .filter(|m| *m > i)
                .map(|m| total - m - 1);
            self.append_map(other.maps[i].invert(), mirror);
        }
    }

    pub fn invert(&self) -> Mapping {
        let mut inverse = Mapping::new();
        inverse.append_mapping_inverted(self);
        inverse
    }

    pub fn get_mirror(&self, n: usize) -> Option<usize> {
        self.mirror.iter().find_map(|&(a, b)| {
            if a == n {
                Some(b)
            } else if b == n {
                Some(a)
            } else {
                None
            }
        })
    }

    pub fn set_mirror(&mut self, n: usize, m: usize) {
        self.mirror.push((n, m));
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }

    pub fn map_result(&self, mut pos: usize, assoc: Assoc) -> MapResult {
        let mut del_info = 0;
        let mut i = 0;
        while i < self.maps.len() {
            let result = self.maps[i].map_result(pos, assoc);
            if let Some(recover) = result.recover {
                if let Some(corr) = self.get_mirror(i).filter(|c| *c > i) {
                    i = corr;
                    pos = self.maps[corr].recover(recover);
                    i += 1;
                    continue;
                }
            }
            del_info |= result.del_info;
            pos = result.pos;
            i += 1;
        }
        MapResult {
            pos,
            del_info,
            recover: None,
        }
    }
}

impl From<StepMap> for Mapping {
    fn from(map: StepMap) -> Self {
        Mapping {
            maps: vec![map],
            mirror: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertions_shift_later_positions() {
        let map = StepMap::single(2, 0, 3);
        assert_eq!(map.map(1, Assoc::After), 1);
        assert_eq!(map.map(2, Assoc::Before), 2);
        assert_eq!(map.map(2, Assoc::After), 5);
        assert_eq!(map.map(4, Assoc::After), 7);
    }

    #[test]
    fn deletions_collapse_and_report() {
        let map = StepMap::single(2, 3, 0);
        let inside = map.map_result(3, Assoc::After);
        assert_eq!(inside.pos, 2);
        assert!(inside.deleted());
        assert!(inside.deleted_across());
        assert_eq!(map.map(6, Assoc::After), 3);
        assert!(!map.map_result(5, Assoc::After).deleted());
    }

    #[test]
    fn inverted_maps_undo_the_shift() {
        let map = StepMap::single(2, 0, 3);
        let inv = map.invert();
        assert_eq!(inv.map(map.map(4, Assoc::After), Assoc::After), 4);
    }

    #[test]
    fn mirrored_maps_recover_positions() {
        // Delete [2, 5) then re-insert the same three positions.
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::single(2, 3, 0), None);
        mapping.append_map(StepMap::single(2, 0, 3), Some(0));
        assert_eq!(mapping.map(3, Assoc::After), 3);
        assert_eq!(mapping.map(4, Assoc::Before), 4);
    }

    #[test]
    fn slices_keep_inner_mirrors() {
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::single(0, 0, 1), None);
        mapping.append_map(StepMap::single(3, 2, 0), None);
        mapping.append_map(StepMap::single(3, 0, 2), Some(1));
        let tail = mapping.slice(1);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.get_mirror(0), Some(1));
        assert_eq!(tail.map(4, Assoc::After), 4);
    }
}
