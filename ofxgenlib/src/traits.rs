//! Трэйты чтения выгрузки и записи документа на основе std::io::{BufRead, Write}.

use crate::{
    error::Result,
    model::{Document, RawRow},
};
use std::io::{BufRead, Write};

pub trait ReadFormat {
    fn read<R: BufRead>(r: R) -> Result<Vec<RawRow>>;
}

pub trait WriteFormat {
    fn write<W: Write>(&self, w: W, doc: &Document) -> Result<()>;
}
