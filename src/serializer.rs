//! Serialization of automatons into byte streams.
//!
//! The stream starts with a small property table (`saveValues`, `size`,
//! `ignoreCase`), followed by the `key_lengths`, `base`, `check` and
//! `fail` arrays, the nullable `output` lists, and optionally the value
//! array. Integers are 7-bit variable-length encoded; strings are
//! length-prefixed UTF-8; fixed-width payloads are little-endian.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::errors::{DachoundError, Result};
use crate::{AhoCorasickDoubleArrayTrie, TAIL_PADDING};

// Type codes of serialized values, following the .NET TypeCode numbering
// the wire format derives from. Codes 15 (decimal) and 16 (date-time)
// have no built-in impl here; 17 is reserved.
pub(crate) mod type_codes {
    pub const BOOLEAN: u8 = 3;
    pub const CHAR: u8 = 4;
    pub const SBYTE: u8 = 5;
    pub const BYTE: u8 = 6;
    pub const INT16: u8 = 7;
    pub const UINT16: u8 = 8;
    pub const INT32: u8 = 9;
    pub const UINT32: u8 = 10;
    pub const INT64: u8 = 11;
    pub const UINT64: u8 = 12;
    pub const SINGLE: u8 = 13;
    pub const DOUBLE: u8 = 14;
    pub const STRING: u8 = 18;
}

const PROP_SAVE_VALUES: &str = "saveValues";
const PROP_SIZE: &str = "size";
const PROP_IGNORE_CASE: &str = "ignoreCase";

/// Values that can travel with a serialized automaton.
///
/// An implementation fixes a one-byte type code and the byte form of a
/// single value. Impls are provided for `bool`, `char`, the fixed-width
/// integers up to 64 bits, `f32`, `f64` and `String`. Callers may
/// implement the trait for their own scalar types, e.g. a date-time
/// carried as its caller-defined 64-bit binary form under type code 16.
pub trait SerializableValue: Sized {
    /// One-byte tag identifying the encoded type on the wire.
    const TYPE_CODE: u8;

    /// Writes one value to the stream.
    fn write_value<W: Write>(&self, wtr: &mut W) -> Result<()>;

    /// Reads one value from the stream.
    fn read_value<R: Read>(rdr: &mut R) -> Result<Self>;
}

impl SerializableValue for bool {
    const TYPE_CODE: u8 = type_codes::BOOLEAN;

    fn write_value<W: Write>(&self, wtr: &mut W) -> Result<()> {
        write_bool(wtr, *self)
    }

    fn read_value<R: Read>(rdr: &mut R) -> Result<Self> {
        read_bool(rdr)
    }
}

impl SerializableValue for char {
    const TYPE_CODE: u8 = type_codes::CHAR;

    fn write_value<W: Write>(&self, wtr: &mut W) -> Result<()> {
        write_varu32(wtr, *self as u32)
    }

    fn read_value<R: Read>(rdr: &mut R) -> Result<Self> {
        let x = read_varu32(rdr)?;
        char::from_u32(x)
            .ok_or_else(|| DachoundError::corrupt_input(format!("{x:#x} is not a scalar value")))
    }
}

impl SerializableValue for i8 {
    const TYPE_CODE: u8 = type_codes::SBYTE;

    fn write_value<W: Write>(&self, wtr: &mut W) -> Result<()> {
        Ok(wtr.write_i8(*self)?)
    }

    fn read_value<R: Read>(rdr: &mut R) -> Result<Self> {
        Ok(rdr.read_i8()?)
    }
}

impl SerializableValue for u8 {
    const TYPE_CODE: u8 = type_codes::BYTE;

    fn write_value<W: Write>(&self, wtr: &mut W) -> Result<()> {
        Ok(wtr.write_u8(*self)?)
    }

    fn read_value<R: Read>(rdr: &mut R) -> Result<Self> {
        Ok(rdr.read_u8()?)
    }
}

impl SerializableValue for i16 {
    const TYPE_CODE: u8 = type_codes::INT16;

    fn write_value<W: Write>(&self, wtr: &mut W) -> Result<()> {
        write_vari32(wtr, i32::from(*self))
    }

    fn read_value<R: Read>(rdr: &mut R) -> Result<Self> {
        let x = read_vari32(rdr)?;
        Self::try_from(x).map_err(|_| DachoundError::corrupt_input("i16 value out of range"))
    }
}

impl SerializableValue for u16 {
    const TYPE_CODE: u8 = type_codes::UINT16;

    fn write_value<W: Write>(&self, wtr: &mut W) -> Result<()> {
        write_varu32(wtr, u32::from(*self))
    }

    fn read_value<R: Read>(rdr: &mut R) -> Result<Self> {
        let x = read_varu32(rdr)?;
        Self::try_from(x).map_err(|_| DachoundError::corrupt_input("u16 value out of range"))
    }
}

impl SerializableValue for i32 {
    const TYPE_CODE: u8 = type_codes::INT32;

    fn write_value<W: Write>(&self, wtr: &mut W) -> Result<()> {
        write_vari32(wtr, *self)
    }

    fn read_value<R: Read>(rdr: &mut R) -> Result<Self> {
        read_vari32(rdr)
    }
}

impl SerializableValue for u32 {
    const TYPE_CODE: u8 = type_codes::UINT32;

    fn write_value<W: Write>(&self, wtr: &mut W) -> Result<()> {
        write_varu32(wtr, *self)
    }

    fn read_value<R: Read>(rdr: &mut R) -> Result<Self> {
        read_varu32(rdr)
    }
}

impl SerializableValue for i64 {
    const TYPE_CODE: u8 = type_codes::INT64;

    fn write_value<W: Write>(&self, wtr: &mut W) -> Result<()> {
        write_varu64(wtr, *self as u64)
    }

    fn read_value<R: Read>(rdr: &mut R) -> Result<Self> {
        Ok(read_varu64(rdr)? as i64)
    }
}

impl SerializableValue for u64 {
    const TYPE_CODE: u8 = type_codes::UINT64;

    fn write_value<W: Write>(&self, wtr: &mut W) -> Result<()> {
        write_varu64(wtr, *self)
    }

    fn read_value<R: Read>(rdr: &mut R) -> Result<Self> {
        read_varu64(rdr)
    }
}

impl SerializableValue for f32 {
    const TYPE_CODE: u8 = type_codes::SINGLE;

    fn write_value<W: Write>(&self, wtr: &mut W) -> Result<()> {
        Ok(wtr.write_f32::<LittleEndian>(*self)?)
    }

    fn read_value<R: Read>(rdr: &mut R) -> Result<Self> {
        Ok(rdr.read_f32::<LittleEndian>()?)
    }
}

impl SerializableValue for f64 {
    const TYPE_CODE: u8 = type_codes::DOUBLE;

    fn write_value<W: Write>(&self, wtr: &mut W) -> Result<()> {
        Ok(wtr.write_f64::<LittleEndian>(*self)?)
    }

    fn read_value<R: Read>(rdr: &mut R) -> Result<Self> {
        Ok(rdr.read_f64::<LittleEndian>()?)
    }
}

impl SerializableValue for String {
    const TYPE_CODE: u8 = type_codes::STRING;

    fn write_value<W: Write>(&self, wtr: &mut W) -> Result<()> {
        write_str(wtr, self)
    }

    fn read_value<R: Read>(rdr: &mut R) -> Result<Self> {
        read_str(rdr)
    }
}

impl<V> AhoCorasickDoubleArrayTrie<V> {
    /// Serializes the automaton into the output stream.
    ///
    /// When `save_values` is `false` the stream omits the value array; a
    /// matching [`load_with`](Self::load_with) can rebuild the values from
    /// the pattern indices.
    ///
    /// # Errors
    ///
    /// [`DachoundError`] is returned when the stream cannot be written, or
    /// when `save_values` is `true` but the automaton carries no values.
    ///
    /// # Examples
    ///
    /// ```
    /// use dachound::AhoCorasickDoubleArrayTrie;
    ///
    /// let patvals = vec![("he", 5u32), ("she", 7u32)];
    /// let pma = AhoCorasickDoubleArrayTrie::with_values(patvals).unwrap();
    ///
    /// let mut buffer = vec![];
    /// pma.save(&mut buffer, true).unwrap();
    ///
    /// let other = AhoCorasickDoubleArrayTrie::<u32>::load(&buffer[..]).unwrap();
    /// assert_eq!(Some(&7), other.get("she"));
    /// ```
    pub fn save<W>(&self, mut wtr: W, save_values: bool) -> Result<()>
    where
        W: Write,
        V: SerializableValue,
    {
        let values = match (save_values, self.values.as_ref()) {
            (true, None) => {
                return Err(DachoundError::invalid_argument(
                    "save_values",
                    "the automaton carries no values",
                ))
            }
            (true, Some(values)) => Some(values),
            (false, _) => None,
        };

        wtr.write_u8(3)?;
        write_str(&mut wtr, PROP_SAVE_VALUES)?;
        wtr.write_u8(type_codes::BOOLEAN)?;
        write_bool(&mut wtr, save_values)?;
        write_str(&mut wtr, PROP_SIZE)?;
        wtr.write_u8(type_codes::INT32)?;
        write_vari32(&mut wtr, (self.base.len() - TAIL_PADDING) as i32)?;
        write_str(&mut wtr, PROP_IGNORE_CASE)?;
        wtr.write_u8(type_codes::BOOLEAN)?;
        write_bool(&mut wtr, self.ignore_case)?;

        write_u32_slice(&mut wtr, &self.key_lengths)?;
        write_i32_slice(&mut wtr, &self.base)?;
        write_i32_slice(&mut wtr, &self.check)?;
        write_u32_slice(&mut wtr, &self.fail)?;

        write_len(&mut wtr, self.output.len())?;
        for out in &self.output {
            match out {
                None => write_vari32(&mut wtr, -1)?,
                Some(list) => {
                    write_len(&mut wtr, list.len())?;
                    for &x in list.iter() {
                        write_varu32(&mut wtr, x)?;
                    }
                }
            }
        }

        if let Some(values) = values {
            write_len(&mut wtr, values.len())?;
            wtr.write_u8(V::TYPE_CODE)?;
            for value in values {
                value.write_value(&mut wtr)?;
            }
        }
        Ok(())
    }

    /// Deserializes an automaton from the input stream.
    ///
    /// When the stream was written with `save_values = false`, the loaded
    /// automaton carries no values and match results report [`None`].
    ///
    /// # Errors
    ///
    /// [`DachoundError`] is returned when the stream cannot be read or is
    /// malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use dachound::AhoCorasickDoubleArrayTrie;
    ///
    /// let pma = AhoCorasickDoubleArrayTrie::with_values(vec![("he", 5u32)]).unwrap();
    ///
    /// let mut buffer = vec![];
    /// pma.save(&mut buffer, false).unwrap();
    ///
    /// let other = AhoCorasickDoubleArrayTrie::<u32>::load(&buffer[..]).unwrap();
    /// assert!(other.matches("uhers"));
    /// assert_eq!(None, other.get("he"));
    /// ```
    pub fn load<R>(rdr: R) -> Result<Self>
    where
        R: Read,
        V: SerializableValue,
    {
        Self::load_impl(rdr, None::<fn(usize) -> V>)
    }

    /// Deserializes an automaton, rebuilding absent values with `restore`.
    ///
    /// `restore` maps a pattern index to its value and is consulted only
    /// when the stream was written with `save_values = false`.
    ///
    /// # Errors
    ///
    /// [`DachoundError`] is returned when the stream cannot be read or is
    /// malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use dachound::AhoCorasickDoubleArrayTrie;
    ///
    /// let pma = AhoCorasickDoubleArrayTrie::with_values(vec![("he", 50u32)]).unwrap();
    ///
    /// let mut buffer = vec![];
    /// pma.save(&mut buffer, false).unwrap();
    ///
    /// let other =
    ///     AhoCorasickDoubleArrayTrie::load_with(&buffer[..], |index| (index as u32 + 1) * 50)
    ///         .unwrap();
    /// assert_eq!(Some(&50), other.get("he"));
    /// ```
    pub fn load_with<R, F>(rdr: R, restore: F) -> Result<Self>
    where
        R: Read,
        V: SerializableValue,
        F: FnMut(usize) -> V,
    {
        Self::load_impl(rdr, Some(restore))
    }

    fn load_impl<R, F>(mut rdr: R, restore: Option<F>) -> Result<Self>
    where
        R: Read,
        V: SerializableValue,
        F: FnMut(usize) -> V,
    {
        let mut save_values = false;
        let mut size: Option<i32> = None;
        let mut ignore_case = false;

        let num_props = rdr.read_u8()?;
        for _ in 0..num_props {
            let name = read_str(&mut rdr)?;
            let type_code = rdr.read_u8()?;
            match name.as_str() {
                PROP_SAVE_VALUES => {
                    expect_type(type_code, type_codes::BOOLEAN)?;
                    save_values = read_bool(&mut rdr)?;
                }
                PROP_SIZE => {
                    expect_type(type_code, type_codes::INT32)?;
                    size = Some(read_vari32(&mut rdr)?);
                }
                PROP_IGNORE_CASE => {
                    expect_type(type_code, type_codes::BOOLEAN)?;
                    ignore_case = read_bool(&mut rdr)?;
                }
                // Properties with unknown names are tolerated.
                _ => skip_property_value(&mut rdr, type_code)?,
            }
        }

        let key_lengths = read_u32_vec(&mut rdr)?;
        let base = read_i32_vec(&mut rdr)?;
        let check = read_i32_vec(&mut rdr)?;
        let fail = read_u32_vec(&mut rdr)?;

        if check.len() != base.len() {
            return Err(DachoundError::corrupt_input(
                "BASE and CHECK must have the same length",
            ));
        }
        if base.len() < TAIL_PADDING {
            return Err(DachoundError::corrupt_input(
                "BASE is shorter than its tail padding",
            ));
        }
        if let Some(size) = size {
            let size = usize::try_from(size)
                .map_err(|_| DachoundError::corrupt_input("negative size property"))?;
            if base.len() != size + TAIL_PADDING {
                return Err(DachoundError::corrupt_input(
                    "size property does not match BASE",
                ));
            }
            if fail.len() != size + 1 {
                return Err(DachoundError::corrupt_input(
                    "FAIL length does not match the size property",
                ));
            }
        }

        let num_outputs = read_varu32(&mut rdr)? as usize;
        if num_outputs != fail.len() {
            return Err(DachoundError::corrupt_input(
                "FAIL and OUTPUT must have the same length",
            ));
        }
        let mut output = Vec::with_capacity(num_outputs);
        for _ in 0..num_outputs {
            let len = read_vari32(&mut rdr)?;
            if len == -1 {
                output.push(None);
                continue;
            }
            let len = usize::try_from(len)
                .map_err(|_| DachoundError::corrupt_input("negative output length"))?;
            let mut list = Vec::with_capacity(len.min(1 << 20));
            for _ in 0..len {
                list.push(read_varu32(&mut rdr)?);
            }
            output.push(Some(list.into_boxed_slice()));
        }

        let values = if save_values {
            let num_values = read_varu32(&mut rdr)? as usize;
            if num_values != key_lengths.len() {
                return Err(DachoundError::corrupt_input(
                    "value count does not match pattern count",
                ));
            }
            let type_code = rdr.read_u8()?;
            if type_code != V::TYPE_CODE {
                return Err(DachoundError::corrupt_input(format!(
                    "value type code mismatch: expected {}, found {}",
                    V::TYPE_CODE,
                    type_code
                )));
            }
            let mut values = Vec::with_capacity(num_values);
            for _ in 0..num_values {
                values.push(V::read_value(&mut rdr)?);
            }
            Some(values)
        } else if let Some(mut restore) = restore {
            Some((0..key_lengths.len()).map(|i| restore(i)).collect())
        } else {
            None
        };

        Ok(Self {
            base,
            check,
            fail,
            output,
            key_lengths,
            values,
            ignore_case,
        })
    }
}

pub(crate) fn write_varu32<W: Write>(wtr: &mut W, mut x: u32) -> Result<()> {
    while x >= 0x80 {
        wtr.write_u8((x as u8) | 0x80)?;
        x >>= 7;
    }
    Ok(wtr.write_u8(x as u8)?)
}

pub(crate) fn read_varu32<R: Read>(rdr: &mut R) -> Result<u32> {
    let mut x = 0u32;
    let mut shift = 0;
    loop {
        let b = rdr.read_u8()?;
        if shift == 28 && b > 0x0f {
            return Err(DachoundError::corrupt_input("malformed 32-bit varint"));
        }
        x |= u32::from(b & 0x7f) << shift;
        if b & 0x80 == 0 {
            return Ok(x);
        }
        shift += 7;
    }
}

pub(crate) fn write_vari32<W: Write>(wtr: &mut W, x: i32) -> Result<()> {
    write_varu32(wtr, x as u32)
}

pub(crate) fn read_vari32<R: Read>(rdr: &mut R) -> Result<i32> {
    Ok(read_varu32(rdr)? as i32)
}

pub(crate) fn write_varu64<W: Write>(wtr: &mut W, mut x: u64) -> Result<()> {
    while x >= 0x80 {
        wtr.write_u8((x as u8) | 0x80)?;
        x >>= 7;
    }
    Ok(wtr.write_u8(x as u8)?)
}

pub(crate) fn read_varu64<R: Read>(rdr: &mut R) -> Result<u64> {
    let mut x = 0u64;
    let mut shift = 0;
    loop {
        let b = rdr.read_u8()?;
        if shift == 63 && b > 0x01 {
            return Err(DachoundError::corrupt_input("malformed 64-bit varint"));
        }
        x |= u64::from(b & 0x7f) << shift;
        if b & 0x80 == 0 {
            return Ok(x);
        }
        shift += 7;
    }
}

fn write_len<W: Write>(wtr: &mut W, len: usize) -> Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| DachoundError::automaton_scale("a section length must fit in u32"))?;
    write_varu32(wtr, len)
}

fn write_str<W: Write>(wtr: &mut W, s: &str) -> Result<()> {
    write_len(wtr, s.len())?;
    Ok(wtr.write_all(s.as_bytes())?)
}

fn read_str<R: Read>(rdr: &mut R) -> Result<String> {
    let len = read_varu32(rdr)? as usize;
    let mut buf = vec![0u8; len];
    rdr.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| DachoundError::corrupt_input("string is not valid UTF-8"))
}

fn write_bool<W: Write>(wtr: &mut W, x: bool) -> Result<()> {
    Ok(wtr.write_u8(u8::from(x))?)
}

fn read_bool<R: Read>(rdr: &mut R) -> Result<bool> {
    match rdr.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        x => Err(DachoundError::corrupt_input(format!(
            "{x} is not a boolean"
        ))),
    }
}

fn write_i32_slice<W: Write>(wtr: &mut W, xs: &[i32]) -> Result<()> {
    write_len(wtr, xs.len())?;
    for &x in xs {
        write_vari32(wtr, x)?;
    }
    Ok(())
}

fn read_i32_vec<R: Read>(rdr: &mut R) -> Result<Vec<i32>> {
    let len = read_varu32(rdr)? as usize;
    let mut xs = Vec::with_capacity(len.min(1 << 20));
    for _ in 0..len {
        xs.push(read_vari32(rdr)?);
    }
    Ok(xs)
}

fn write_u32_slice<W: Write>(wtr: &mut W, xs: &[u32]) -> Result<()> {
    write_len(wtr, xs.len())?;
    for &x in xs {
        write_varu32(wtr, x)?;
    }
    Ok(())
}

fn read_u32_vec<R: Read>(rdr: &mut R) -> Result<Vec<u32>> {
    let len = read_varu32(rdr)? as usize;
    let mut xs = Vec::with_capacity(len.min(1 << 20));
    for _ in 0..len {
        xs.push(read_varu32(rdr)?);
    }
    Ok(xs)
}

/// Consumes the payload of a property whose name the reader does not know.
fn skip_property_value<R: Read>(rdr: &mut R, type_code: u8) -> Result<()> {
    match type_code {
        type_codes::BOOLEAN | type_codes::SBYTE | type_codes::BYTE => {
            rdr.read_u8()?;
        }
        type_codes::CHAR
        | type_codes::INT16
        | type_codes::UINT16
        | type_codes::INT32
        | type_codes::UINT32 => {
            read_varu32(rdr)?;
        }
        type_codes::INT64 | type_codes::UINT64 => {
            read_varu64(rdr)?;
        }
        type_codes::SINGLE => {
            rdr.read_f32::<LittleEndian>()?;
        }
        type_codes::DOUBLE => {
            rdr.read_f64::<LittleEndian>()?;
        }
        type_codes::STRING => {
            read_str(rdr)?;
        }
        _ => {
            return Err(DachoundError::corrupt_input(format!(
                "unknown type code {type_code}"
            )))
        }
    }
    Ok(())
}

fn expect_type(found: u8, expected: u8) -> Result<()> {
    if found == expected {
        Ok(())
    } else {
        Err(DachoundError::corrupt_input(format!(
            "unexpected property type code {found}"
        )))
    }
}
