//! Streaming reader and unit field extraction on on-disk roll documents.

use rollmap_lib::modules::roll::domain::DerivedCode;
use rollmap_lib::modules::roll::infrastructure::unit_parser::{parse_cubf, parse_derived_code};
use rollmap_lib::modules::roll::infrastructure::RollDocumentReader;
use std::io::Write;

fn unit(cubf: &str, optional: &str) -> String {
    format!(
        "<RLUEx>\
           <RL0101><RL0101x><RL0101Ax>55</RL0101Ax><RL0101Gx>ROY</RL0101Gx></RL0101x></RL0101>\
           <RL0104><RL0104A>1234</RL0104A><RL0104B>56</RL0104B><RL0104C>7890</RL0104C>{}</RL0104>\
           <RL0105A>{}</RL0105A>\
         </RLUEx>",
        optional, cubf
    )
}

fn write_document(units: &[String]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
    write!(
        file,
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><RL><RLM01A>66023</RLM01A><RLM02A>2022</RLM02A>{}</RL>",
        units.concat()
    )
    .unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn reads_header_then_every_unit() {
    let file = write_document(&[unit("1000", ""), unit("4500", ""), unit("7449", "")]);
    let mut reader = RollDocumentReader::open(file.path()).unwrap();

    let header = reader.read_header().unwrap();
    assert_eq!(header.muni_code, "66023");
    assert_eq!(header.year, 2022);

    let mut cubfs = Vec::new();
    while let Some(node) = reader.next_unit().unwrap() {
        cubfs.push(parse_cubf(&node).unwrap());
    }
    assert_eq!(cubfs, vec![1000, 4500, 7449]);
    assert!(reader.position() > 0);
}

#[test]
fn derived_code_pads_missing_optional_segments() {
    let file = write_document(&[
        unit("1000", ""),
        unit("1000", "<RL0104D>1</RL0104D><RL0104E>002</RL0104E><RL0104F>0003</RL0104F>"),
    ]);
    let mut reader = RollDocumentReader::open(file.path()).unwrap();
    reader.read_header().unwrap();

    let first = parse_derived_code(&reader.next_unit().unwrap().unwrap()).unwrap();
    let second = parse_derived_code(&reader.next_unit().unwrap().unwrap()).unwrap();

    assert_eq!(first.as_str(), "123456789000000000");
    assert_eq!(second.as_str(), "123456789010020003");
    assert_eq!(first.unit_id("66023").unwrap(), "66023123456789000000000");
}

#[test]
fn derived_code_is_deterministic() {
    let a = DerivedCode::parse("123456789010020003").unwrap();
    let b = DerivedCode::parse("123456789010020003").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.unit_id("66023").unwrap(), b.unit_id("66023").unwrap());
    assert!(!a.is_aggregate());
}
