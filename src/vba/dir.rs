//! Dir-stream parser (MS-OVBA §2.3.4.2).
//!
//! The decompressed dir stream is a flat tag/length/value record sequence
//! in three regions: project information (terminated by the
//! PROJECTCONSTANTS record), references (terminated by peeking the
//! PROJECTMODULES tag), and the modules table. The parser walks a
//! forward-only cursor and fails soft: on any truncated or malformed
//! record the error is logged and whatever module metadata accumulated so
//! far is returned, so a damaged project still yields its readable
//! modules.
//!
//! All parse state lives in a per-call [`ProjectContext`]; nothing leaks
//! between files.

use crate::common::binary::ByteCursor;
use crate::common::codepage::{decode_mbcs, decode_utf16le};
use crate::common::error::Result;
use std::collections::HashMap;

// PROJECTINFORMATION record ids
pub const PROJECTSYSKIND: u16 = 0x0001;
pub const PROJECTLCID: u16 = 0x0002;
pub const PROJECTCODEPAGE: u16 = 0x0003;
pub const PROJECTNAME: u16 = 0x0004;
pub const PROJECTDOCSTRING: u16 = 0x0005;
pub const PROJECTHELPFILEPATH: u16 = 0x0006;
pub const PROJECTHELPCONTEXT: u16 = 0x0007;
pub const PROJECTLIBFLAGS: u16 = 0x0008;
pub const PROJECTVERSION: u16 = 0x0009;
pub const PROJECTCONSTANTS: u16 = 0x000C;
pub const PROJECTLCIDINVOKE: u16 = 0x0014;

// PROJECTREFERENCES record ids
pub const REFERENCENAME: u16 = 0x0016;
pub const REFERENCECONTROL: u16 = 0x002F;
pub const REFERENCEORIGINAL: u16 = 0x0033;
pub const REFERENCEREGISTERED: u16 = 0x000D;
pub const REFERENCEPROJECT: u16 = 0x000E;

// PROJECTMODULES record ids
pub const PROJECTMODULES: u16 = 0x000F;
pub const PROJECTCOOKIE: u16 = 0x0013;
pub const MODULETYPE_PROCEDURAL: u16 = 0x0021;
pub const MODULETYPE_DOCUMENT: u16 = 0x0022;
pub const MODULEREADONLY: u16 = 0x0025;
pub const MODULEPRIVATE: u16 = 0x0028;

/// Declared kind of a macro module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleType {
    /// Procedural code module (.bas)
    Standard,
    /// Class, document, or designer module; disambiguated by the classifier
    ClassDocOrForm,
    Unknown,
}

/// Metadata for one macro module, as declared by the dir stream.
#[derive(Debug, Clone)]
pub struct VbaModuleInfo {
    /// Human display name (Unicode name record)
    pub module_name: String,
    /// Name of the module's stream inside the VBA storage; the map key
    pub stream_name: String,
    /// Project-wide code page, captured at parse time
    pub code_page: u16,
    /// Byte offset into the module stream where the compressed source begins
    pub text_offset: u32,
    pub module_type: ModuleType,
    /// Set by the classifier after parsing
    pub save_extension: Option<&'static str>,
}

/// Project-level fields accumulated while walking the dir stream.
///
/// Constructed fresh for every parse call and never retained afterwards;
/// the code page in particular must not bleed into another file's parse.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Code page for every MBCS string decode in this project
    pub code_page: u16,
    pub sys_kind: u32,
    pub lcid: u32,
    pub lcid_invoke: u32,
    pub name: String,
    pub doc_string: String,
    pub doc_string_unicode: String,
    pub help_file_path: String,
    pub help_file_path_2: String,
    pub help_context: u32,
    pub lib_flags: u32,
    /// "major.minor" from the PROJECTVERSION record
    pub version: String,
    pub constants: String,
    pub constants_unicode: String,
}

impl Default for ProjectContext {
    fn default() -> Self {
        Self {
            code_page: 1252,
            sys_kind: 0,
            lcid: 0,
            lcid_invoke: 0,
            name: String::new(),
            doc_string: String::new(),
            doc_string_unicode: String::new(),
            help_file_path: String::new(),
            help_file_path_2: String::new(),
            help_context: 0,
            lib_flags: 0,
            version: String::new(),
            constants: String::new(),
            constants_unicode: String::new(),
        }
    }
}

/// Result of a dir-stream parse.
#[derive(Debug, Default)]
pub struct DirStream {
    pub context: ProjectContext,
    /// Modules keyed by Unicode stream name; first occurrence wins
    pub modules: HashMap<String, VbaModuleInfo>,
    /// Module count declared by the PROJECTMODULES record
    pub declared_module_count: u16,
}

/// Parse a decompressed dir stream.
///
/// Never fails: malformed input yields whatever was recovered before the
/// damage, with the condition logged.
pub fn parse(data: &[u8]) -> DirStream {
    let mut cur = ByteCursor::new(data);
    let mut out = DirStream {
        context: ProjectContext::default(),
        modules: HashMap::new(),
        declared_module_count: 0,
    };

    if let Err(err) = parse_records(&mut cur, &mut out) {
        log::warn!(
            "dir stream malformed at offset {}: {err}; keeping {} module(s) recovered so far",
            cur.position(),
            out.modules.len()
        );
    }

    out
}

fn parse_records(cur: &mut ByteCursor<'_>, out: &mut DirStream) -> Result<()> {
    read_project_information(cur, &mut out.context)?;
    read_references(cur, &out.context)?;
    read_modules(cur, out)
}

/// Region A: project information, terminated by PROJECTCONSTANTS.
fn read_project_information(cur: &mut ByteCursor<'_>, ctx: &mut ProjectContext) -> Result<()> {
    while !cur.at_end() {
        let tag = cur.read_u16()?;
        match tag {
            PROJECTSYSKIND => {
                let _size = cur.read_u32()?;
                ctx.sys_kind = cur.read_u32()?;
            }
            PROJECTLCID => {
                let _size = cur.read_u32()?;
                ctx.lcid = cur.read_u32()?;
            }
            PROJECTLCIDINVOKE => {
                let _size = cur.read_u32()?;
                ctx.lcid_invoke = cur.read_u32()?;
            }
            PROJECTCODEPAGE => {
                let _size = cur.read_u32()?;
                // Every later MBCS decode in this project uses this value
                ctx.code_page = cur.read_u16()?;
            }
            PROJECTNAME => {
                ctx.name = read_mbcs_value(cur, ctx.code_page)?;
            }
            PROJECTDOCSTRING => {
                ctx.doc_string = read_mbcs_value(cur, ctx.code_page)?;
                let _reserved = cur.read_u16()?;
                ctx.doc_string_unicode = read_utf16_value(cur)?;
            }
            PROJECTHELPFILEPATH => {
                ctx.help_file_path = read_mbcs_value(cur, ctx.code_page)?;
                let _reserved = cur.read_u16()?;
                ctx.help_file_path_2 = read_mbcs_value(cur, ctx.code_page)?;
            }
            PROJECTHELPCONTEXT => {
                let _size = cur.read_u32()?;
                ctx.help_context = cur.read_u32()?;
            }
            PROJECTLIBFLAGS => {
                let _size = cur.read_u32()?;
                ctx.lib_flags = cur.read_u32()?;
            }
            PROJECTVERSION => {
                let _reserved = cur.read_u32()?;
                let major = cur.read_u32()?;
                let minor = cur.read_u16()?;
                ctx.version = format!("{major}.{minor}");
            }
            PROJECTCONSTANTS => {
                ctx.constants = read_mbcs_value(cur, ctx.code_page)?;
                let _reserved = cur.read_u16()?;
                ctx.constants_unicode = read_utf16_value(cur)?;
                // Always the last record of the project information region
                return Ok(());
            }
            _ => {
                // Generic escape: unknown project records carry a 4-byte
                // length, mandatory for forward compatibility
                let len = cur.read_u32()?;
                log::debug!("skipping unrecognized project record 0x{tag:04X} ({len} bytes)");
                cur.skip(len as usize)?;
            }
        }
    }
    Ok(())
}

/// Region B: references, terminated by peeking the PROJECTMODULES tag.
fn read_references(cur: &mut ByteCursor<'_>, ctx: &ProjectContext) -> Result<()> {
    while !cur.at_end() {
        let tag = cur.read_u16()?;
        match tag {
            PROJECTMODULES => {
                // Hand the tag back to the modules region
                cur.rewind(2);
                return Ok(());
            }
            REFERENCENAME => {
                read_reference_name_body(cur, ctx)?;
            }
            REFERENCECONTROL => {
                read_reference_control_body(cur, ctx)?;
            }
            REFERENCEORIGINAL => {
                let libid_original = read_mbcs_value(cur, ctx.code_page)?;
                log::debug!("reference original libid: {libid_original}");
                // The format emits the twiddled control record back to back
                // with the original libid; parse both as one unit
                let _control_tag = cur.read_u16()?;
                read_reference_control_body(cur, ctx)?;
            }
            REFERENCEREGISTERED => {
                let _size = cur.read_u32()?;
                let libid = read_mbcs_value(cur, ctx.code_page)?;
                log::debug!("registered reference libid: {libid}");
                let _reserved1 = cur.read_u32()?;
                let _reserved2 = cur.read_u16()?;
            }
            REFERENCEPROJECT => {
                let _size = cur.read_u32()?;
                let libid_absolute = read_mbcs_value(cur, ctx.code_page)?;
                let _libid_relative = read_mbcs_value(cur, ctx.code_page)?;
                let _major = cur.read_u32()?;
                let _minor = cur.read_u16()?;
                log::debug!("project reference libid: {libid_absolute}");
            }
            _ => {
                // Reference records carry no generic length field, so an
                // unknown tag desynchronizes the cursor. Resynchronize on
                // the modules table rather than abandoning the project.
                log::warn!(
                    "unknown reference record 0x{tag:04X} at offset {}; scanning for modules table",
                    cur.position() - 2
                );
                match cur.find_tag(PROJECTMODULES) {
                    Some(at) => cur.seek_to(at),
                    None => {
                        cur.seek_to(usize::MAX);
                        return Ok(());
                    }
                }
            }
        }
    }
    Ok(())
}

/// REFERENCENAME body: MBCS name, reserved, Unicode name.
fn read_reference_name_body(cur: &mut ByteCursor<'_>, ctx: &ProjectContext) -> Result<()> {
    let name = read_mbcs_value(cur, ctx.code_page)?;
    let _reserved = cur.read_u16()?;
    let _name_unicode = read_utf16_value(cur)?;
    log::debug!("reference name: {name}");
    Ok(())
}

/// REFERENCECONTROL body, after its 2-byte tag has been consumed.
fn read_reference_control_body(cur: &mut ByteCursor<'_>, ctx: &ProjectContext) -> Result<()> {
    let _size_twiddled = cur.read_u32()?;
    let len = cur.read_u32()?;
    let _libid_twiddled = decode_mbcs(cur.read_bytes(len as usize)?, ctx.code_page);
    let _reserved1 = cur.read_u32()?;
    let _reserved2 = cur.read_u16()?;

    // Embedded REFERENCENAME sub-record
    let _name_tag = cur.read_u16()?;
    read_reference_name_body(cur, ctx)?;

    let _reserved3 = cur.read_u16()?;
    let _size_extended = cur.read_u32()?;
    let len = cur.read_u32()?;
    let _libid_extended = decode_utf16le(cur.read_bytes(len as usize)?);
    let _reserved4 = cur.read_u32()?;
    let _reserved5 = cur.read_u16()?;
    let _original_typelib = cur.read_bytes(16)?;
    let _cookie = cur.read_u32()?;
    Ok(())
}

/// Region C: the modules table plus any trailing cookie record.
fn read_modules(cur: &mut ByteCursor<'_>, out: &mut DirStream) -> Result<()> {
    while !cur.at_end() {
        let tag = cur.read_u16()?;
        match tag {
            PROJECTMODULES => {
                let _size = cur.read_u32()?;
                let count = cur.read_u16()?;
                out.declared_module_count = count;

                // Nested cookie record
                let _cookie_tag = cur.read_u16()?;
                let _cookie_size = cur.read_u32()?;
                let _cookie = cur.read_u16()?;

                for _ in 0..count {
                    read_module_group(cur, out)?;
                }
            }
            PROJECTCOOKIE => {
                let _size = cur.read_u32()?;
                let _cookie = cur.read_u16()?;
            }
            _ => {
                log::debug!("stopping at unexpected trailing record 0x{tag:04X}");
                return Ok(());
            }
        }
    }
    Ok(())
}

/// One module's sub-record group, in the fixed order the format requires.
fn read_module_group(cur: &mut ByteCursor<'_>, out: &mut DirStream) -> Result<()> {
    let code_page = out.context.code_page;

    // MODULENAME
    let _tag = cur.read_u16()?;
    let _name = read_mbcs_value(cur, code_page)?;

    // MODULENAMEUNICODE
    let _tag = cur.read_u16()?;
    let name_unicode = read_utf16_value(cur)?;

    // MODULESTREAMNAME + reserved + Unicode copy
    let _tag = cur.read_u16()?;
    let _stream_name = read_mbcs_value(cur, code_page)?;
    let _reserved = cur.read_u16()?;
    let stream_name_unicode = read_utf16_value(cur)?;

    // MODULEDOCSTRING + reserved + Unicode copy
    let _tag = cur.read_u16()?;
    let _doc_string = read_mbcs_value(cur, code_page)?;
    let _reserved = cur.read_u16()?;
    let _doc_string_unicode = read_utf16_value(cur)?;

    // MODULEOFFSET
    let _tag = cur.read_u16()?;
    let _size = cur.read_u32()?;
    let text_offset = cur.read_u32()?;

    // MODULEHELPCONTEXT
    let _tag = cur.read_u16()?;
    let _size = cur.read_u32()?;
    let _help_context = cur.read_u32()?;

    // MODULECOOKIE
    let _tag = cur.read_u16()?;
    let _size = cur.read_u32()?;
    let _cookie = cur.read_u16()?;

    // MODULETYPE: the tag value itself declares the kind
    let type_tag = cur.read_u16()?;
    let _reserved = cur.read_u32()?;
    let module_type = match type_tag {
        MODULETYPE_PROCEDURAL => ModuleType::Standard,
        MODULETYPE_DOCUMENT => ModuleType::ClassDocOrForm,
        _ => ModuleType::Unknown,
    };

    // Optional READONLY and PRIVATE records precede the terminator
    let mut next = cur.read_u16()?;
    if next == MODULEREADONLY {
        let _reserved = cur.read_u32()?;
        next = cur.read_u16()?;
    }
    if next == MODULEPRIVATE {
        let _reserved = cur.read_u32()?;
        next = cur.read_u16()?;
    }
    // `next` holds the terminator tag; a final reserved u32 closes the group
    let _terminator = next;

    // Accumulate before consuming the trailing reserved field: a stream
    // truncated at the tail still keeps this module. First occurrence
    // wins on stream-name collisions.
    out.modules
        .entry(stream_name_unicode.clone())
        .or_insert_with(|| VbaModuleInfo {
            module_name: name_unicode,
            stream_name: stream_name_unicode,
            code_page,
            text_offset,
            module_type,
            save_extension: None,
        });

    let _reserved = cur.read_u32()?;
    Ok(())
}

/// Length-prefixed MBCS string decoded with the project code page.
fn read_mbcs_value(cur: &mut ByteCursor<'_>, code_page: u16) -> Result<String> {
    let len = cur.read_u32()?;
    Ok(decode_mbcs(cur.read_bytes(len as usize)?, code_page))
}

/// Length-prefixed UTF-16LE string.
fn read_utf16_value(cur: &mut ByteCursor<'_>) -> Result<String> {
    let len = cur.read_u32()?;
    Ok(decode_utf16le(cur.read_bytes(len as usize)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Byte-level builder for synthetic dir streams.
    #[derive(Default)]
    struct Builder(Vec<u8>);

    impl Builder {
        fn u16(mut self, v: u16) -> Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }

        fn u32(mut self, v: u32) -> Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }

        fn raw(mut self, bytes: &[u8]) -> Self {
            self.0.extend_from_slice(bytes);
            self
        }

        /// Fixed-size record: tag, size 4, u32 value.
        fn rec_u32(self, tag: u16, value: u32) -> Self {
            self.u16(tag).u32(4).u32(value)
        }

        /// Length-prefixed byte string.
        fn lp(self, bytes: &[u8]) -> Self {
            self.u32(bytes.len() as u32).raw(bytes)
        }

        fn build(self) -> Vec<u8> {
            self.0
        }
    }

    fn utf16(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    /// Minimal region A: syskind, codepage, name, constants terminator.
    fn project_info(code_page: u16, name: &[u8]) -> Builder {
        Builder::default()
            .rec_u32(PROJECTSYSKIND, 1)
            .u16(PROJECTCODEPAGE)
            .u32(2)
            .u16(code_page)
            .u16(PROJECTNAME)
            .lp(name)
            .u16(PROJECTCONSTANTS)
            .lp(b"")
            .u16(0x003C)
            .lp(&[])
    }

    fn module_group(
        name: &str,
        stream_name: &str,
        offset: u32,
        type_tag: u16,
        read_only: bool,
        private: bool,
    ) -> Vec<u8> {
        let mut b = Builder::default()
            .u16(0x0019) // MODULENAME
            .lp(name.as_bytes())
            .u16(0x0047) // MODULENAMEUNICODE
            .lp(&utf16(name))
            .u16(0x001A) // MODULESTREAMNAME
            .lp(stream_name.as_bytes())
            .u16(0x0032)
            .lp(&utf16(stream_name))
            .u16(0x001C) // MODULEDOCSTRING
            .lp(b"")
            .u16(0x0048)
            .lp(&[])
            .u16(0x0031) // MODULEOFFSET
            .u32(4)
            .u32(offset)
            .u16(0x001E) // MODULEHELPCONTEXT
            .u32(4)
            .u32(0)
            .u16(0x002C) // MODULECOOKIE
            .u32(2)
            .u16(0xFFFF)
            .u16(type_tag)
            .u32(0);
        if read_only {
            b = b.u16(MODULEREADONLY).u32(0);
        }
        if private {
            b = b.u16(MODULEPRIVATE).u32(0);
        }
        b.u16(0x002B).u32(0).build() // terminator + final reserved
    }

    fn modules_region(declared: u16, groups: &[Vec<u8>]) -> Vec<u8> {
        let mut b = Builder::default()
            .u16(PROJECTMODULES)
            .u32(2)
            .u16(declared)
            .u16(PROJECTCOOKIE)
            .u32(2)
            .u16(0xFFFF);
        for group in groups {
            b = b.raw(group);
        }
        b.build()
    }

    #[test]
    fn test_single_module() {
        let group = module_group("Module1", "Module1", 10, MODULETYPE_PROCEDURAL, false, false);
        let data = project_info(1252, b"TestProject")
            .raw(&modules_region(1, &[group]))
            .build();

        let parsed = parse(&data);
        assert_eq!(parsed.context.name, "TestProject");
        assert_eq!(parsed.declared_module_count, 1);
        assert_eq!(parsed.modules.len(), 1);

        let info = &parsed.modules["Module1"];
        assert_eq!(info.module_name, "Module1");
        assert_eq!(info.stream_name, "Module1");
        assert_eq!(info.text_offset, 10);
        assert_eq!(info.code_page, 1252);
        assert_eq!(info.module_type, ModuleType::Standard);
        assert!(info.save_extension.is_none());
    }

    #[test]
    fn test_code_page_record_governs_later_decodes() {
        // Shift-JIS katakana "ア" as the project name
        let group = module_group("Mod", "Mod", 0, MODULETYPE_PROCEDURAL, false, false);
        let data = project_info(932, &[0x83, 0x41])
            .raw(&modules_region(1, &[group]))
            .build();

        let parsed = parse(&data);
        assert_eq!(parsed.context.code_page, 932);
        assert_eq!(parsed.context.name, "\u{30A2}");
        assert_eq!(parsed.modules["Mod"].code_page, 932);
    }

    #[test]
    fn test_unknown_project_record_generic_skip() {
        // An unknown tag with a declared length must advance the cursor by
        // exactly 4 + length, leaving the next record aligned
        let group = module_group("M", "M", 0, MODULETYPE_PROCEDURAL, false, false);
        let data = Builder::default()
            .rec_u32(PROJECTSYSKIND, 1)
            .u16(0x00AB)
            .lp(&[0xDE; 7])
            .u16(PROJECTNAME)
            .lp(b"AfterUnknown")
            .u16(PROJECTCONSTANTS)
            .lp(b"")
            .u16(0x003C)
            .lp(&[])
            .raw(&modules_region(1, &[group]))
            .build();

        let parsed = parse(&data);
        assert_eq!(parsed.context.name, "AfterUnknown");
        assert_eq!(parsed.modules.len(), 1);
    }

    #[test]
    fn test_duplicate_stream_name_first_wins() {
        let first = module_group("A", "Shared", 10, MODULETYPE_PROCEDURAL, false, false);
        let second = module_group("B", "Shared", 99, MODULETYPE_DOCUMENT, false, false);
        let data = project_info(1252, b"P")
            .raw(&modules_region(2, &[first, second]))
            .build();

        let parsed = parse(&data);
        assert_eq!(parsed.declared_module_count, 2);
        assert_eq!(parsed.modules.len(), 1);
        assert_eq!(parsed.modules["Shared"].text_offset, 10);
        assert_eq!(parsed.modules["Shared"].module_name, "A");
    }

    #[test]
    fn test_truncated_module_group_keeps_partial_results() {
        let first = module_group("Good", "Good", 4, MODULETYPE_PROCEDURAL, false, false);
        let mut second = module_group("Bad", "Bad", 8, MODULETYPE_PROCEDURAL, false, false);
        second.truncate(second.len() / 2);
        let data = project_info(1252, b"P")
            .raw(&modules_region(2, &[first, second]))
            .build();

        let parsed = parse(&data);
        assert_eq!(parsed.modules.len(), 1);
        assert!(parsed.modules.contains_key("Good"));
    }

    #[test]
    fn test_truncation_at_trailing_reserved_keeps_module() {
        // Everything up to the terminator tag parsed fine; only the
        // final reserved field is missing
        let mut group = module_group("Tail", "Tail", 3, MODULETYPE_PROCEDURAL, false, false);
        group.truncate(group.len() - 4);
        let data = project_info(1252, b"P")
            .raw(&modules_region(1, &[group]))
            .build();

        let parsed = parse(&data);
        assert!(parsed.modules.contains_key("Tail"));
        assert_eq!(parsed.modules["Tail"].text_offset, 3);
    }

    #[test]
    fn test_references_are_consumed() {
        let registered = Builder::default()
            .u16(REFERENCEREGISTERED)
            .u32(0)
            .lp(b"*\\G{00020430-0000-0000-C000-000000000046}#2.0#0#stdole2.tlb#OLE Automation")
            .u32(0)
            .u16(0)
            .build();
        let name = Builder::default()
            .u16(REFERENCENAME)
            .lp(b"stdole")
            .u16(0x003E)
            .lp(&utf16("stdole"))
            .build();
        let group = module_group("M", "M", 0, MODULETYPE_PROCEDURAL, false, false);
        let data = project_info(1252, b"P")
            .raw(&name)
            .raw(&registered)
            .raw(&modules_region(1, &[group]))
            .build();

        let parsed = parse(&data);
        assert_eq!(parsed.modules.len(), 1);
    }

    #[test]
    fn test_reference_project_record() {
        let reference = Builder::default()
            .u16(REFERENCEPROJECT)
            .u32(0)
            .lp(b"*\\CC:\\other\\project.xls")
            .lp(b"project.xls")
            .u32(1)
            .u16(0)
            .build();
        let group = module_group("M", "M", 0, MODULETYPE_PROCEDURAL, false, false);
        let data = project_info(1252, b"P")
            .raw(&reference)
            .raw(&modules_region(1, &[group]))
            .build();

        assert_eq!(parse(&data).modules.len(), 1);
    }

    /// REFERENCECONTROL body after its tag: twiddled libid, embedded
    /// name sub-record, extended libid, original typelib GUID, cookie.
    fn reference_control_body(libid: &str) -> Vec<u8> {
        Builder::default()
            .u32(0) // size of twiddled section
            .lp(libid.as_bytes())
            .u32(0)
            .u16(0)
            .u16(REFERENCENAME)
            .lp(b"Ctl")
            .u16(0x003E)
            .lp(&utf16("Ctl"))
            .u16(0x0030) // reserved before the extended section
            .u32(0) // size of extended section
            .lp(&utf16(libid))
            .u32(0)
            .u16(0)
            .raw(&[0x11; 16]) // original typelib GUID
            .u32(2) // cookie
            .build()
    }

    #[test]
    fn test_reference_control_record() {
        let group = module_group("M", "M", 0, MODULETYPE_PROCEDURAL, false, false);
        let data = project_info(1252, b"P")
            .u16(REFERENCECONTROL)
            .raw(&reference_control_body("*\\G{D7053240-CE69-11CD-A777-00DD01143C57}#1.0#0#FM20.DLL"))
            .raw(&modules_region(1, &[group]))
            .build();

        let parsed = parse(&data);
        assert_eq!(parsed.modules.len(), 1);
        assert!(parsed.modules.contains_key("M"));
    }

    #[test]
    fn test_reference_original_with_control_pair() {
        // The twiddled control record follows the original libid back to
        // back and the two must be consumed as one unit
        let group = module_group("M", "M", 7, MODULETYPE_PROCEDURAL, false, false);
        let data = project_info(1252, b"P")
            .u16(REFERENCEORIGINAL)
            .lp(b"*\\G{0D452EE1-E08F-101A-852E-02608C4D0BB4}#2.0#0#FM20.DLL")
            .u16(REFERENCECONTROL)
            .raw(&reference_control_body("*\\G{0D452EE1-E08F-101A-852E-02608C4D0BB4}#2.0#0#FM20.DLL"))
            .raw(&modules_region(1, &[group]))
            .build();

        let parsed = parse(&data);
        assert_eq!(parsed.modules.len(), 1);
        assert_eq!(parsed.modules["M"].text_offset, 7);
    }

    #[test]
    fn test_unknown_reference_tag_resyncs_on_modules() {
        let group = module_group("M", "M", 0, MODULETYPE_PROCEDURAL, false, false);
        let data = project_info(1252, b"P")
            .u16(0x0099) // no such reference record
            .raw(&[0xAA; 9])
            .raw(&modules_region(1, &[group]))
            .build();

        let parsed = parse(&data);
        assert_eq!(parsed.modules.len(), 1);
    }

    #[test]
    fn test_optional_readonly_and_private_records() {
        let first = module_group("Locked", "Locked", 0, MODULETYPE_DOCUMENT, true, true);
        let second = module_group("Plain", "Plain", 0, MODULETYPE_PROCEDURAL, false, false);
        let data = project_info(1252, b"P")
            .raw(&modules_region(2, &[first, second]))
            .build();

        let parsed = parse(&data);
        assert_eq!(parsed.modules.len(), 2);
        assert_eq!(parsed.modules["Locked"].module_type, ModuleType::ClassDocOrForm);
        assert_eq!(parsed.modules["Plain"].module_type, ModuleType::Standard);
    }

    #[test]
    fn test_unrecognized_module_type_tag() {
        let group = module_group("Odd", "Odd", 0, 0x0023, false, false);
        let data = project_info(1252, b"P")
            .raw(&modules_region(1, &[group]))
            .build();

        assert_eq!(parse(&data).modules["Odd"].module_type, ModuleType::Unknown);
    }

    #[test]
    fn test_trailing_cookie_record() {
        let group = module_group("M", "M", 0, MODULETYPE_PROCEDURAL, false, false);
        let data = project_info(1252, b"P")
            .raw(&modules_region(1, &[group]))
            .u16(PROJECTCOOKIE)
            .u32(2)
            .u16(0xFFFF)
            .build();

        assert_eq!(parse(&data).modules.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let parsed = parse(&[]);
        assert!(parsed.modules.is_empty());
        assert_eq!(parsed.context.code_page, 1252);
    }

    #[test]
    fn test_garbage_input_is_fail_soft() {
        let parsed = parse(&[0xFF; 37]);
        assert!(parsed.modules.is_empty());
    }

    #[test]
    fn test_context_is_fresh_per_parse() {
        let group = module_group("M", "M", 0, MODULETYPE_PROCEDURAL, false, false);
        let with_cp = project_info(932, b"P")
            .raw(&modules_region(1, &[group.clone()]))
            .build();
        let without_cp = Builder::default()
            .u16(PROJECTNAME)
            .lp(b"Q")
            .u16(PROJECTCONSTANTS)
            .lp(b"")
            .u16(0x003C)
            .lp(&[])
            .raw(&modules_region(1, &[group]))
            .build();

        assert_eq!(parse(&with_cp).context.code_page, 932);
        // A parse with no PROJECTCODEPAGE record starts from the default
        // again; nothing carries over from the previous call
        assert_eq!(parse(&without_cp).context.code_page, 1252);
    }
}
