//! Structural class-file reader.
//!
//! Only the header is decoded: the constant pool, access flags, this class,
//! super class and the direct interfaces. Fields, methods and attributes are
//! never touched, so arbitrary (even invalid) method bodies do not matter.

use plugpack_core::{ClassName, Error, Result};

/// Magic number at the start of every class file.
pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;

/// Access flag of interfaces.
pub const ACC_INTERFACE: u16 = 0x0200;

/// Access flag of abstract classes (and interfaces).
pub const ACC_ABSTRACT: u16 = 0x0400;

/// Header information of one compiled class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    /// Class name in dotted form.
    pub name: ClassName,
    /// Direct superclass; `None` only for `java.lang.Object` and module
    /// descriptors.
    pub super_class: Option<ClassName>,
    /// Directly implemented interfaces, in declaration order.
    pub interfaces: Vec<ClassName>,
    /// Raw access flags.
    pub access_flags: u16,
}

#[derive(Debug)]
enum Constant {
    Utf8(String),
    Class { name_index: u16 },
    Other,
    /// Second slot of a long or double constant.
    Unusable,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    origin: &'a str,
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8], origin: &'a str) -> Self {
        Self {
            bytes,
            pos: 0,
            origin,
        }
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::ClassFormat {
            origin: self.origin.to_string(),
            reason: reason.into(),
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| self.error(format!("truncated at offset {}", self.pos)))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }
}

impl ClassInfo {
    /// Parses the header of a class file.
    ///
    /// `origin` names the file in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassFormat`] if the bytes do not start with
    /// [`CLASS_MAGIC`], are truncated, use an unknown constant-pool tag, or
    /// reference constants of the wrong kind.
    pub fn parse(bytes: &[u8], origin: &str) -> Result<Self> {
        let mut reader = Reader::new(bytes, origin);

        let magic = reader.u32()?;
        if magic != CLASS_MAGIC {
            return Err(reader.error(format!("bad magic 0x{magic:08X}")));
        }
        // minor_version, major_version
        reader.skip(4)?;

        let pool = read_constant_pool(&mut reader)?;

        let access_flags = reader.u16()?;
        let this_class = reader.u16()?;
        let super_class = reader.u16()?;
        let interface_count = reader.u16()?;
        let mut interface_indices = Vec::with_capacity(usize::from(interface_count));
        for _ in 0..interface_count {
            interface_indices.push(reader.u16()?);
        }

        let name = class_at(&reader, &pool, this_class)?;
        let super_class = if super_class == 0 {
            None
        } else {
            Some(class_at(&reader, &pool, super_class)?)
        };
        let interfaces = interface_indices
            .into_iter()
            .map(|index| class_at(&reader, &pool, index))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name,
            super_class,
            interfaces,
            access_flags,
        })
    }

    /// Returns `true` for interfaces.
    #[must_use]
    pub const fn is_interface(&self) -> bool {
        self.access_flags & ACC_INTERFACE != 0
    }

    /// Returns `true` for abstract classes and interfaces.
    #[must_use]
    pub const fn is_abstract(&self) -> bool {
        self.access_flags & ACC_ABSTRACT != 0
    }

    /// Returns `true` if the class can be instantiated by the host.
    #[must_use]
    pub const fn is_concrete(&self) -> bool {
        !self.is_interface() && !self.is_abstract()
    }

    /// Direct supertypes: the superclass followed by the interfaces.
    pub fn supertypes(&self) -> impl Iterator<Item = &ClassName> {
        self.super_class.iter().chain(self.interfaces.iter())
    }
}

fn read_constant_pool(reader: &mut Reader<'_>) -> Result<Vec<Constant>> {
    let count = reader.u16()?;
    // Index 0 is never valid.
    let mut pool = Vec::with_capacity(usize::from(count));
    pool.push(Constant::Unusable);

    while pool.len() < usize::from(count) {
        let tag = reader.u8()?;
        match tag {
            1 => {
                let len = reader.u16()?;
                let raw = reader.take(usize::from(len))?;
                pool.push(Constant::Utf8(String::from_utf8_lossy(raw).into_owned()));
            }
            3 | 4 => {
                reader.skip(4)?;
                pool.push(Constant::Other);
            }
            5 | 6 => {
                reader.skip(8)?;
                pool.push(Constant::Other);
                pool.push(Constant::Unusable);
            }
            7 => {
                let name_index = reader.u16()?;
                pool.push(Constant::Class { name_index });
            }
            8 | 16 | 19 | 20 => {
                reader.skip(2)?;
                pool.push(Constant::Other);
            }
            9..=12 | 17 | 18 => {
                reader.skip(4)?;
                pool.push(Constant::Other);
            }
            15 => {
                reader.skip(3)?;
                pool.push(Constant::Other);
            }
            other => {
                return Err(reader.error(format!(
                    "unknown constant pool tag {other} at entry {}",
                    pool.len()
                )));
            }
        }
    }

    Ok(pool)
}

fn class_at(reader: &Reader<'_>, pool: &[Constant], index: u16) -> Result<ClassName> {
    let name_index = match pool.get(usize::from(index)) {
        Some(Constant::Class { name_index }) => *name_index,
        _ => return Err(reader.error(format!("constant {index} is not a class reference"))),
    };
    match pool.get(usize::from(name_index)) {
        Some(Constant::Utf8(name)) => Ok(ClassName::from_internal(name)),
        _ => Err(reader.error(format!("constant {name_index} is not a UTF-8 string"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct PoolBuilder {
        bytes: Vec<u8>,
        count: u16,
    }

    impl PoolBuilder {
        fn push(&mut self, entry: &[u8], slots: u16) -> u16 {
            let index = self.count + 1;
            self.bytes.extend_from_slice(entry);
            self.count += slots;
            index
        }

        fn utf8(&mut self, s: &str) -> u16 {
            let mut entry = vec![1];
            entry.extend_from_slice(&u16::try_from(s.len()).unwrap().to_be_bytes());
            entry.extend_from_slice(s.as_bytes());
            self.push(&entry, 1)
        }

        fn class(&mut self, internal: &str) -> u16 {
            let name = self.utf8(internal);
            let [hi, lo] = name.to_be_bytes();
            self.push(&[7, hi, lo], 1)
        }
    }

    /// Minimal class file with a long constant (two slots) ahead of the
    /// class entries.
    fn class_bytes(name: &str, super_name: &str, interfaces: &[&str], flags: u16) -> Vec<u8> {
        let mut pool = PoolBuilder::default();
        pool.push(&[5, 0, 0, 0, 0, 0, 0, 0, 42], 2);
        let this_index = pool.class(name);
        let super_index = pool.class(super_name);
        let iface_indices: Vec<u16> = interfaces.iter().map(|i| pool.class(i)).collect();

        let mut out = CLASS_MAGIC.to_be_bytes().to_vec();
        out.extend_from_slice(&[0, 0, 0, 52]);
        out.extend_from_slice(&(pool.count + 1).to_be_bytes());
        out.extend_from_slice(&pool.bytes);
        out.extend_from_slice(&flags.to_be_bytes());
        out.extend_from_slice(&this_index.to_be_bytes());
        out.extend_from_slice(&super_index.to_be_bytes());
        out.extend_from_slice(&u16::try_from(iface_indices.len()).unwrap().to_be_bytes());
        for index in iface_indices {
            out.extend_from_slice(&index.to_be_bytes());
        }
        // fields, methods, attributes
        out.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
        out
    }

    #[test]
    fn test_parse_header() {
        let bytes = class_bytes(
            "com/example/ExamplePlugin",
            "com/lagradost/cloudstream3/plugins/Plugin",
            &["java/lang/Runnable"],
            0x0021,
        );
        let info = ClassInfo::parse(&bytes, "ExamplePlugin.class").unwrap();

        assert_eq!(info.name.as_str(), "com.example.ExamplePlugin");
        assert_eq!(
            info.super_class.as_ref().map(ClassName::as_str),
            Some("com.lagradost.cloudstream3.plugins.Plugin")
        );
        assert_eq!(info.interfaces, vec![ClassName::new("java.lang.Runnable")]);
        assert!(info.is_concrete());
        assert_eq!(info.supertypes().count(), 2);
    }

    #[test]
    fn test_abstract_and_interface_flags() {
        let abstract_class = ClassInfo::parse(&class_bytes("a/A", "java/lang/Object", &[], 0x0421), "A").unwrap();
        assert!(abstract_class.is_abstract());
        assert!(!abstract_class.is_interface());
        assert!(!abstract_class.is_concrete());

        let iface = ClassInfo::parse(&class_bytes("a/I", "java/lang/Object", &[], 0x0601), "I").unwrap();
        assert!(iface.is_interface());
        assert!(!iface.is_concrete());
    }

    #[test]
    fn test_bad_magic() {
        let err = ClassInfo::parse(&[0xDE, 0xAD, 0xBE, 0xEF, 0, 0, 0, 0], "x.class").unwrap_err();
        assert!(matches!(err, Error::ClassFormat { .. }));
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn test_truncated_file() {
        let bytes = class_bytes("a/B", "java/lang/Object", &[], 0x0021);
        let err = ClassInfo::parse(&bytes[..20], "B.class").unwrap_err();
        assert!(err.to_string().contains("truncated"));
        assert!(err.to_string().contains("B.class"));
    }

    #[test]
    fn test_unknown_tag() {
        let mut bytes = CLASS_MAGIC.to_be_bytes().to_vec();
        bytes.extend_from_slice(&[0, 0, 0, 52, 0, 2, 99]);
        let err = ClassInfo::parse(&bytes, "weird.class").unwrap_err();
        assert!(err.to_string().contains("unknown constant pool tag 99"));
    }
}
