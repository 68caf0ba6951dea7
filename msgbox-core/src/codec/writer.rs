use super::*;

/// Largest magnitude that still takes the unsigned-integer path.
const UNSIGNED_LIMIT: f64 = 4_294_967_296.0;

/// Encode a value into its binary form.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.push(simple(SIMPLE_NULL)),
        Value::Undefined => out.push(simple(SIMPLE_UNDEFINED)),
        Value::Bool(false) => out.push(simple(SIMPLE_FALSE)),
        Value::Bool(true) => out.push(simple(SIMPLE_TRUE)),
        Value::Number(n) => write_number(out, *n),
        Value::Bytes(b) => {
            write_head(out, MAJOR_BYTES, b.len() as u64);
            out.extend_from_slice(b);
        }
        Value::Text(t) => {
            write_head(out, MAJOR_TEXT, t.len() as u64);
            out.extend_from_slice(t.as_bytes());
        }
        Value::Array(items) => {
            write_head(out, MAJOR_ARRAY, items.len() as u64);
            for item in items {
                write_value(out, item);
            }
        }
        Value::Map(entries) => {
            write_head(out, MAJOR_MAP, entries.len() as u64);
            for (k, v) in entries {
                write_value(out, k);
                write_value(out, v);
            }
        }
    }
}

fn write_number(out: &mut Vec<u8>, n: f64) {
    let integral = n.fract() == 0.0;
    if integral && (0.0..UNSIGNED_LIMIT).contains(&n) {
        write_head(out, MAJOR_UNSIGNED, n as u64);
    } else if integral && (-24.0..0.0).contains(&n) {
        // -1 maps to 0, -24 maps to 23.
        out.push((MAJOR_NEGATIVE << 5) | (-1.0 - n) as u8);
    } else {
        out.push(simple(INFO_U64));
        out.extend_from_slice(&n.to_be_bytes());
    }
}

/// Write a head byte plus the shortest argument that holds `arg`.
fn write_head(out: &mut Vec<u8>, major: u8, arg: u64) {
    let major = major << 5;
    if arg < 24 {
        out.push(major | arg as u8);
    } else if arg < 0x100 {
        out.push(major | INFO_U8);
        out.push(arg as u8);
    } else if arg < 0x1_0000 {
        out.push(major | INFO_U16);
        out.extend_from_slice(&(arg as u16).to_be_bytes());
    } else if arg < 0x1_0000_0000 {
        out.push(major | INFO_U32);
        out.extend_from_slice(&(arg as u32).to_be_bytes());
    } else {
        out.push(major | INFO_U64);
        out.extend_from_slice(&arg.to_be_bytes());
    }
}

fn simple(info: u8) -> u8 {
    (MAJOR_SIMPLE << 5) | info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_integers_inline() {
        assert_eq!(encode(&Value::Number(0.0)), vec![0x00]);
        assert_eq!(encode(&Value::Number(23.0)), vec![0x17]);
    }

    #[test]
    fn test_integer_thresholds() {
        assert_eq!(encode(&Value::Number(24.0)), vec![0x18, 24]);
        assert_eq!(encode(&Value::Number(255.0)), vec![0x18, 0xff]);
        assert_eq!(encode(&Value::Number(256.0)), vec![0x19, 0x01, 0x00]);
        assert_eq!(encode(&Value::Number(65535.0)), vec![0x19, 0xff, 0xff]);
        assert_eq!(encode(&Value::Number(65536.0)), vec![0x1a, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_negative_inline_range() {
        assert_eq!(encode(&Value::Number(-1.0)), vec![0x20]);
        assert_eq!(encode(&Value::Number(-24.0)), vec![0x37]);
    }

    #[test]
    fn test_other_numbers_fall_back_to_double() {
        for n in [-25.0, 1.5, 4_294_967_296.0] {
            let bytes = encode(&Value::Number(n));
            assert_eq!(bytes[0], 0xfb);
            assert_eq!(&bytes[1..], &n.to_be_bytes());
        }
    }

    #[test]
    fn test_specials() {
        assert_eq!(encode(&Value::Bool(false)), vec![0xf4]);
        assert_eq!(encode(&Value::Bool(true)), vec![0xf5]);
        assert_eq!(encode(&Value::Null), vec![0xf6]);
        assert_eq!(encode(&Value::Undefined), vec![0xf7]);
    }

    #[test]
    fn test_containers_are_count_prefixed() {
        let value = Value::Map(vec![(Value::from("a"), Value::Array(vec![Value::Null; 2]))]);
        assert_eq!(encode(&value), vec![0xa1, 0x61, b'a', 0x82, 0xf6, 0xf6]);
    }
}
