//! Writes the object, entries and externals files
//!
//! Every value is printed as exactly two radix-32 digits drawn from
//! a deliberately unconventional alphabet; two digits cover any
//! 10-bit word. The `.ent` and `.ext` files are only created when
//! they would have content, and stale ones are removed.

use std::fs;
use std::io;

use super::codegen::{CodeGen, OutRecord};
use super::context::FileContext;
use super::{
    Address, DC_INIT, ENTRIES_EXTENSION, EXTERNALS_EXTENSION, IC_INIT, OBJECT_EXTENSION,
};

/// The radix-32 digit alphabet, in value order. This is a wire
/// format: the sequence must never change.
pub const RADIX32_DIGITS: [char; 32] = [
    '!', '@', '#', '$', '%', '^', '&', '*', '<', '>', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v',
];

/// Column separator inside the object file
const COLUMN_GAP: &str = "    ";

/// Encode a value as two radix-32 digits, high digit first
pub fn radix32(value: Address) -> String {
    let value = value as usize;
    let high = RADIX32_DIGITS[(value / 32) % 32];
    let low = RADIX32_DIGITS[value % 32];
    [high, low].iter().collect()
}

/// Write `<base>.ob`, and `<base>.ent` / `<base>.ext` when entries
/// or extern uses exist
pub fn write_outputs(base: &str, codegen: &CodeGen, ctx: &FileContext) -> io::Result<()> {
    write_object(&format!("{base}{OBJECT_EXTENSION}"), codegen, ctx)?;
    write_records(&format!("{base}{ENTRIES_EXTENSION}"), &codegen.entry_records)?;
    write_records(&format!("{base}{EXTERNALS_EXTENSION}"), &codegen.extern_records)?;
    Ok(())
}

/// The object file: a header with the instruction and data word
/// counts, then one line per word at successive addresses. The data
/// block follows the instruction block without a gap.
fn write_object(path: &str, codegen: &CodeGen, ctx: &FileContext) -> io::Result<()> {
    let mut out = String::new();
    out.push_str(&radix32(ctx.ic - IC_INIT));
    out.push_str(COLUMN_GAP);
    out.push_str(&radix32(ctx.dc - DC_INIT));
    out.push('\n');

    let mut address = IC_INIT;
    for word in codegen.instr_words.iter().chain(codegen.data_words.iter()) {
        out.push_str(&radix32(address));
        out.push_str(COLUMN_GAP);
        out.push_str(&radix32(Address::from(*word)));
        out.push('\n');
        address += 1;
    }
    fs::write(path, out)
}

/// One `name<TAB>address` line per record; an empty collection means
/// the file must not exist at all
fn write_records(path: &str, records: &[OutRecord]) -> io::Result<()> {
    if records.is_empty() {
        return match fs::remove_file(path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            result => result,
        };
    }

    let mut out = String::new();
    for record in records {
        out.push_str(&record.name);
        out.push('\t');
        out.push_str(&radix32(record.address));
        out.push('\n');
    }
    fs::write(path, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{first_pass, resolve};
    use std::io::Cursor;

    fn decode(digits: &str) -> Address {
        let mut value = 0;
        for ch in digits.chars() {
            let digit = RADIX32_DIGITS.iter().position(|d| *d == ch).unwrap();
            value = value * 32 + digit as Address;
        }
        value
    }

    #[test]
    fn test_radix32_examples() {
        assert_eq!(radix32(0), "!!");
        assert_eq!(radix32(1), "!@");
        assert_eq!(radix32(31), "!v");
        assert_eq!(radix32(32), "@!");
        assert_eq!(radix32(100), "$%");
        assert_eq!(radix32(1020), "vs");
        assert_eq!(radix32(1023), "vv");
    }

    #[test]
    fn test_radix32_round_trips_every_word() {
        for value in 0..1024 {
            let encoded = radix32(value);
            assert_eq!(encoded.chars().count(), 2);
            assert_eq!(decode(&encoded), value);
        }
    }

    #[test]
    fn test_object_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("prog");
        let base = base.to_str().unwrap();

        let mut ctx = FileContext::new();
        let mut codegen = CodeGen::new();
        first_pass(
            &mut ctx,
            &mut codegen,
            Cursor::new(b"MAIN: mov #-1, r3\nstop\n".as_slice()),
        );
        resolve::apply_ic_offset(&mut ctx);
        resolve::second_pass(&mut codegen, &mut ctx);
        assert!(!ctx.error);

        write_outputs(base, &codegen, &ctx).unwrap();
        let object = fs::read_to_string(format!("{base}.ob")).unwrap();
        assert_eq!(object, "!%    !!\n$%    !c\n$^    vs\n$&    !c\n$*    u!\n");
        assert!(!fs::exists(format!("{base}.ent")).unwrap());
        assert!(!fs::exists(format!("{base}.ext")).unwrap());
    }

    #[test]
    fn test_stale_companion_files_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("prog");
        let base = base.to_str().unwrap();
        fs::write(format!("{base}.ent"), "stale\n").unwrap();
        fs::write(format!("{base}.ext"), "stale\n").unwrap();

        let mut ctx = FileContext::new();
        let mut codegen = CodeGen::new();
        first_pass(&mut ctx, &mut codegen, Cursor::new(b"stop\n".as_slice()));
        resolve::apply_ic_offset(&mut ctx);
        resolve::second_pass(&mut codegen, &mut ctx);
        write_outputs(base, &codegen, &ctx).unwrap();

        assert!(!fs::exists(format!("{base}.ent")).unwrap());
        assert!(!fs::exists(format!("{base}.ext")).unwrap());
    }

    #[test]
    fn test_entries_and_externals_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("prog");
        let base = base.to_str().unwrap();

        let source = b".entry MAIN\n.extern OUT\nMAIN: jsr OUT\nstop\n".as_slice();
        let mut ctx = FileContext::new();
        let mut codegen = CodeGen::new();
        first_pass(&mut ctx, &mut codegen, Cursor::new(source));
        resolve::apply_ic_offset(&mut ctx);
        resolve::second_pass(&mut codegen, &mut ctx);
        assert!(!ctx.error);

        write_outputs(base, &codegen, &ctx).unwrap();
        let entries = fs::read_to_string(format!("{base}.ent")).unwrap();
        assert_eq!(entries, "MAIN\t$%\n");
        let externals = fs::read_to_string(format!("{base}.ext")).unwrap();
        assert_eq!(externals, "OUT\t$^\n");
    }
}
