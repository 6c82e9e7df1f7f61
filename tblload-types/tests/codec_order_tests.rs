use tblload_types::codec::{BeI32, BeI64, Codec, FixedSizeCodec, LenPrefixedStr};
use tblload_types::{RecordBuffer, Schema, Value, decode_record, encode_record};

/// Re-derive field boundaries by replaying the schema over the encoded bytes.
fn field_widths(schema: &Schema, bytes: &[u8]) -> Vec<usize> {
    let mut pos = 0;
    let mut widths = Vec::new();
    for column in schema.columns() {
        let used = match column.column_type() {
            tblload_types::ColumnType::Varchar => LenPrefixedStr::decode(&bytes[pos..]).unwrap().1,
            tblload_types::ColumnType::Int => BeI32::decode(&bytes[pos..]).unwrap().1,
            tblload_types::ColumnType::Long => BeI64::decode(&bytes[pos..]).unwrap().1,
        };
        widths.push(used);
        pos += used;
    }
    assert_eq!(pos, bytes.len(), "replay must exhaust the record exactly");
    widths
}

#[test]
fn replayed_widths_sum_to_returned_length() {
    let schema =
        Schema::parse_header("a:INT,b:VARCHAR,c:LONG,d:VARCHAR,e:INT", ',').expect("schema");
    let mut buf = RecordBuffer::default();

    let rows = [
        ["1", "", "2", "", "3"],
        ["-7", "hello", "0", "world!", "42"],
        ["0", "a,b", "-1", "multi byte: ß", "9"],
    ];
    for row in rows {
        let n = encode_record(&schema, &row, &mut buf).expect("encode");
        let widths = field_widths(&schema, buf.as_bytes());
        assert_eq!(widths.iter().sum::<usize>(), n);
        assert_eq!(widths[0], BeI32::ENCODED_SIZE);
        assert_eq!(widths[2], BeI64::ENCODED_SIZE);
        assert_eq!(widths[4], BeI32::ENCODED_SIZE);
        assert_eq!(widths[1], 2 + row[1].len());
        assert_eq!(widths[3], 2 + row[3].len());
    }
}

#[test]
fn fixed_width_keys_sort_numerically_for_non_negative_values() {
    let mut prev: Option<Vec<u8>> = None;
    for v in [0i64, 1, 255, 256, 30_000, 1 << 40] {
        let mut buf = [0u8; 8];
        BeI64::encode_at(&mut buf, v).unwrap();
        if let Some(p) = &prev {
            assert!(p.as_slice() < &buf[..]);
        }
        prev = Some(buf.to_vec());
    }
}

#[test]
fn decode_reports_typed_values() {
    let schema = Schema::parse_header("k:LONG,v:VARCHAR", ',').unwrap();
    let mut buf = RecordBuffer::new(64).unwrap();
    encode_record(&schema, &["99", "ninety-nine"], &mut buf).unwrap();
    assert_eq!(
        decode_record(&schema, buf.as_bytes()).unwrap(),
        vec![Value::Long(99), Value::Varchar("ninety-nine".into())]
    );
}
