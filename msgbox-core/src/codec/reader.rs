use super::*;

/// Decode exactly one value; trailing bytes are an error.
pub fn decode(bytes: &[u8]) -> Result<Value, CodecError> {
    let mut reader = Reader { bytes, pos: 0 };
    let value = reader.read_value(0)?;
    let rest = bytes.len() - reader.pos;
    if rest != 0 {
        return Err(CodecError::TrailingBytes(rest));
    }
    Ok(value)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(CodecError::Truncated { needed: n, offset: self.pos })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read the argument that follows a head byte with the given low 5 bits.
    fn read_arg(&mut self, head: u8) -> Result<u64, CodecError> {
        match head & 0x1f {
            info @ 0..=23 => Ok(info as u64),
            INFO_U8 => Ok(self.take_array::<1>()?[0] as u64),
            INFO_U16 => Ok(u16::from_be_bytes(self.take_array()?) as u64),
            INFO_U32 => Ok(u32::from_be_bytes(self.take_array()?) as u64),
            INFO_U64 => Ok(u64::from_be_bytes(self.take_array()?)),
            _ => Err(CodecError::UnsupportedTag(head)),
        }
    }

    fn read_len(&mut self, head: u8) -> Result<usize, CodecError> {
        let arg = self.read_arg(head)?;
        usize::try_from(arg).map_err(|_| CodecError::Truncated {
            needed: usize::MAX,
            offset: self.pos,
        })
    }

    fn read_value(&mut self, depth: usize) -> Result<Value, CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::DepthExceeded);
        }
        let head = self.take_array::<1>()?[0];
        match head >> 5 {
            MAJOR_UNSIGNED => Ok(Value::Number(self.read_arg(head)? as f64)),
            MAJOR_NEGATIVE => Ok(Value::Number(-1.0 - self.read_arg(head)? as f64)),
            MAJOR_BYTES => {
                let len = self.read_len(head)?;
                Ok(Value::Bytes(self.take(len)?.to_vec()))
            }
            MAJOR_TEXT => {
                let len = self.read_len(head)?;
                let raw = self.take(len)?;
                let text = std::str::from_utf8(raw).map_err(|_| CodecError::InvalidUtf8)?;
                Ok(Value::Text(text.to_string()))
            }
            MAJOR_ARRAY => {
                let count = self.read_len(head)?;
                // Every element needs at least one byte.
                let mut items = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    items.push(self.read_value(depth + 1)?);
                }
                Ok(Value::Array(items))
            }
            MAJOR_MAP => {
                let count = self.read_len(head)?;
                let mut entries = Vec::with_capacity(count.min(self.remaining() / 2));
                for _ in 0..count {
                    let key = self.read_value(depth + 1)?;
                    let value = self.read_value(depth + 1)?;
                    entries.push((key, value));
                }
                Ok(Value::Map(entries))
            }
            MAJOR_SIMPLE => self.read_simple(head),
            MAJOR_TAG => Err(CodecError::UnsupportedMajorType(MAJOR_TAG)),
            major => Err(CodecError::UnsupportedMajorType(major)),
        }
    }

    fn read_simple(&mut self, head: u8) -> Result<Value, CodecError> {
        match head & 0x1f {
            SIMPLE_FALSE => Ok(Value::Bool(false)),
            SIMPLE_TRUE => Ok(Value::Bool(true)),
            SIMPLE_NULL => Ok(Value::Null),
            SIMPLE_UNDEFINED => Ok(Value::Undefined),
            INFO_U16 => Ok(Value::Number(half_to_f64(u16::from_be_bytes(self.take_array()?)))),
            INFO_U32 => Ok(Value::Number(f32::from_be_bytes(self.take_array()?) as f64)),
            INFO_U64 => Ok(Value::Number(f64::from_be_bytes(self.take_array()?))),
            _ => Err(CodecError::UnsupportedTag(head)),
        }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

/// IEEE-754 binary16 to f64.
fn half_to_f64(bits: u16) -> f64 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exponent = ((bits >> 10) & 0x1f) as i32;
    let mantissa = (bits & 0x3ff) as f64;
    let magnitude = match exponent {
        0 => mantissa * 2f64.powi(-24),
        31 if mantissa == 0.0 => f64::INFINITY,
        31 => f64::NAN,
        _ => (1.0 + mantissa / 1024.0) * 2f64.powi(exponent - 15),
    };
    sign * magnitude
}
