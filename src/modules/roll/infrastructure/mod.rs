pub mod repository;
pub mod unit_parser;
pub mod xml_reader;

pub use repository::EvalUnitRepositoryImpl;
pub use xml_reader::{DocumentHeader, RollDocumentReader, XmlNode};
