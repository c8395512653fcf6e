//! `.fnm` field schema: the set of field names known to a segment, the
//! stable field number each is addressed by in the term dictionary and
//! postings files, and whether the field is indexed.

use crate::directory::Directory;
use crate::error::{LuceneError, LuceneResult};
use crate::store::{IndexInput, IndexOutput};

const INDEXED_BIT: u8 = 0x1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub number: i32,
    pub indexed: bool,
}

/// A segment's field schema, ordered by field number (the field's position
/// in this list), addressable by name or by number.
#[derive(Debug, Clone, Default)]
pub struct FieldInfos {
    by_number: Vec<FieldInfo>,
}

impl FieldInfos {
    pub fn new() -> Self {
        FieldInfos { by_number: Vec::new() }
    }

    /// Returns the existing field number if `name` is already known,
    /// otherwise adds it and returns the freshly assigned number.
    pub fn add(&mut self, name: &str, indexed: bool) -> i32 {
        if let Some(existing) = self.by_number.iter_mut().find(|f| f.name == name) {
            existing.indexed |= indexed;
            return existing.number;
        }
        let number = self.by_number.len() as i32;
        self.by_number.push(FieldInfo {
            name: name.to_string(),
            number,
            indexed,
        });
        number
    }

    pub fn by_name(&self, name: &str) -> Option<&FieldInfo> {
        self.by_number.iter().find(|f| f.name == name)
    }

    pub fn by_num(&self, number: i32) -> Option<&FieldInfo> {
        self.by_number.get(number as usize)
    }

    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_number.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldInfo> {
        self.by_number.iter()
    }

    pub fn indexed_field_names(&self) -> Vec<String> {
        self.by_number
            .iter()
            .filter(|f| f.indexed)
            .map(|f| f.name.clone())
            .collect()
    }

    pub fn write(&self, dir: &dyn Directory, segment: &str) -> LuceneResult<()> {
        let mut out = dir.create(&format!("{segment}.fnm"))?;
        out.write_vint(self.by_number.len() as i32)?;
        for info in &self.by_number {
            out.write_string(&info.name)?;
            let bits = if info.indexed { INDEXED_BIT } else { 0 };
            out.write_byte(bits)?;
        }
        out.close()
    }

    pub fn read_from(input: &mut dyn IndexInput) -> LuceneResult<Self> {
        let count = input.read_vint()?;
        if count < 0 {
            return Err(LuceneError::invalid_format("negative field count in .fnm"));
        }
        let mut by_number = Vec::with_capacity(count as usize);
        for number in 0..count {
            let name = input.read_string()?;
            let bits = input.read_byte()?;
            by_number.push(FieldInfo {
                name,
                number,
                indexed: bits & INDEXED_BIT != 0,
            });
        }
        Ok(FieldInfos { by_number })
    }

    pub fn read(dir: &dyn Directory, segment: &str) -> LuceneResult<Self> {
        let mut input = dir.open(&format!("{segment}.fnm"), true)?;
        Self::read_from(input.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{Directory, RamDirectory};

    #[test]
    fn round_trips_through_a_directory() {
        let dir = RamDirectory::new();
        let mut infos = FieldInfos::new();
        infos.add("title", true);
        infos.add("body", true);
        infos.add("thumbnail", false);
        infos.write(&dir, "_0").unwrap();

        let back = FieldInfos::read(&dir, "_0").unwrap();
        assert_eq!(back.len(), 3);
        assert_eq!(back.by_name("title").unwrap().number, 0);
        assert_eq!(back.by_name("body").unwrap().number, 1);
        assert!(!back.by_name("thumbnail").unwrap().indexed);
    }
}
