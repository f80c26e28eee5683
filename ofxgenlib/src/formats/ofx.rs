//! OFX: заголовок + дерево SIGNONMSGSRSV1 / INVSTMTMSGSRSV1 / SECLISTMSGSRSV1.

use crate::{
    error::{OfxGenError, Result},
    formats::header::OfxHeader,
    model::{Document, InvestmentStatement, Security, Signon, Status, Transaction, TransactionKind},
    traits::WriteFormat,
};
use chrono::{DateTime, NaiveDate, Utc};
use quick_xml::{
    escape::partial_escape,
    events::{BytesStart, BytesText, Event},
    Writer,
};
use rust_decimal::Decimal;
use std::io::Write;

/// Деньги выписки всегда идут с денежного субсчёта.
const SUBACCT_FUND: &str = "CASH";
const UNIQUEID_TYPE: &str = "OTHER";

pub struct Ofx {
    pub header: OfxHeader,
}

impl Ofx {
    pub fn new(version: u16) -> Self {
        Self {
            header: OfxHeader::new(version),
        }
    }

    /// Заголовок и дерево одной строкой; дерево с отступом в два пробела.
    pub fn render(&self, doc: &Document) -> Result<String> {
        let mut tree = Vec::new();
        write_tree(&mut tree, doc)?;
        let tree = String::from_utf8(tree).map_err(xml)?;
        Ok(format!("{}{}", self.header, tree))
    }
}

impl WriteFormat for Ofx {
    fn write<W: Write>(&self, mut w: W, doc: &Document) -> Result<()> {
        let text = self.render(doc)?;
        w.write_all(text.as_bytes())?;
        Ok(())
    }
}

/* ------------------------------- дерево --------------------------------- */

fn write_tree<W: Write>(w: W, doc: &Document) -> Result<()> {
    let mut wr = Writer::new_with_indent(w, b' ', 2);

    open(&mut wr, "OFX")?;
    write_signon(&mut wr, &doc.signon)?;
    write_statement(&mut wr, &doc.statement)?;
    write_security_list(&mut wr, &doc.securities)?;
    close(&mut wr, "OFX")
}

fn write_signon<W: Write>(wr: &mut Writer<W>, s: &Signon) -> Result<()> {
    open(wr, "SIGNONMSGSRSV1")?;
    open(wr, "SONRS")?;
    write_status(wr, &s.status)?;
    leaf(wr, "DTSERVER", &ofx_datetime(&s.server_time))?;
    leaf(wr, "LANGUAGE", &s.language)?;
    open(wr, "FI")?;
    leaf(wr, "ORG", &s.institution.org)?;
    leaf(wr, "FID", &s.institution.fid)?;
    close(wr, "FI")?;
    close(wr, "SONRS")?;
    close(wr, "SIGNONMSGSRSV1")
}

fn write_statement<W: Write>(wr: &mut Writer<W>, st: &InvestmentStatement) -> Result<()> {
    open(wr, "INVSTMTMSGSRSV1")?;
    open(wr, "INVSTMTTRNRS")?;
    leaf(wr, "TRNUID", &st.trn_uid)?;
    write_status(wr, &st.status)?;

    open(wr, "INVSTMTRS")?;
    leaf(wr, "DTASOF", &ofx_datetime(&st.as_of))?;
    leaf(wr, "CURDEF", &st.currency)?;

    open(wr, "INVACCTFROM")?;
    leaf(wr, "BROKERID", &st.account.broker_id)?;
    leaf(wr, "ACCTID", &st.account.account_id)?;
    close(wr, "INVACCTFROM")?;

    open(wr, "INVTRANLIST")?;
    leaf(wr, "DTSTART", &ofx_datetime(&st.period.start))?;
    leaf(wr, "DTEND", &ofx_datetime(&st.period.end))?;
    for tx in &st.transactions {
        write_transaction(wr, tx)?;
    }
    close(wr, "INVTRANLIST")?;

    close(wr, "INVSTMTRS")?;
    close(wr, "INVSTMTTRNRS")?;
    close(wr, "INVSTMTMSGSRSV1")
}

fn write_transaction<W: Write>(wr: &mut Writer<W>, tx: &Transaction) -> Result<()> {
    if tx.kind != TransactionKind::Buy {
        return Err(OfxGenError::Unsupported("only buy transactions can be written"));
    }
    let security = tx
        .security
        .as_ref()
        .ok_or_else(|| structural("BUYOTHER", "SECID"))?;
    let units = tx.quantity.ok_or_else(|| structural("BUYOTHER", "UNITS"))?;
    let unit_price = tx.unit_price.ok_or_else(|| structural("BUYOTHER", "UNITPRICE"))?;
    let total = tx.total.ok_or_else(|| structural("BUYOTHER", "TOTAL"))?;

    open(wr, "BUYOTHER")?;
    open(wr, "INVBUY")?;

    open(wr, "INVTRAN")?;
    leaf(wr, "FITID", &tx.fitid)?;
    leaf(wr, "DTTRADE", &ofx_datetime(&tx.trade_time))?;
    if let Some(d) = tx.settlement_date {
        leaf(wr, "DTSETTLE", &ofx_date(d))?;
    }
    close(wr, "INVTRAN")?;

    write_secid(wr, security)?;
    leaf(wr, "UNITS", &amount(units))?;
    leaf(wr, "UNITPRICE", &amount(unit_price))?;
    if let Some(c) = tx.commission {
        leaf(wr, "COMMISSION", &amount(c))?;
    }
    if let Some(f) = tx.fee {
        leaf(wr, "FEES", &amount(f))?;
    }
    leaf(wr, "TOTAL", &amount(total))?;
    leaf(wr, "SUBACCTSEC", tx.sub_account.as_ofx())?;
    leaf(wr, "SUBACCTFUND", SUBACCT_FUND)?;

    close(wr, "INVBUY")?;
    close(wr, "BUYOTHER")
}

fn write_security_list<W: Write>(wr: &mut Writer<W>, securities: &[Security]) -> Result<()> {
    open(wr, "SECLISTMSGSRSV1")?;
    open(wr, "SECLIST")?;
    for s in securities {
        open(wr, "MFINFO")?;
        open(wr, "SECINFO")?;
        write_secid(wr, s)?;
        leaf(wr, "SECNAME", &s.description)?;
        leaf(wr, "TICKER", &s.ticker)?;
        close(wr, "SECINFO")?;
        close(wr, "MFINFO")?;
    }
    close(wr, "SECLIST")?;
    close(wr, "SECLISTMSGSRSV1")
}

fn write_secid<W: Write>(wr: &mut Writer<W>, s: &Security) -> Result<()> {
    open(wr, "SECID")?;
    leaf(wr, "UNIQUEID", &s.id.to_string())?;
    leaf(wr, "UNIQUEIDTYPE", UNIQUEID_TYPE)?;
    close(wr, "SECID")
}

fn write_status<W: Write>(wr: &mut Writer<W>, st: &Status) -> Result<()> {
    open(wr, "STATUS")?;
    leaf(wr, "CODE", &st.code.to_string())?;
    leaf(wr, "SEVERITY", st.severity.as_ofx())?;
    close(wr, "STATUS")
}

/* ------------------------------- хелперы -------------------------------- */

fn open<W: Write>(wr: &mut Writer<W>, tag: &str) -> Result<()> {
    wr.write_event(Event::Start(BytesStart::new(tag))).map_err(xml)
}

fn close<W: Write>(wr: &mut Writer<W>, tag: &str) -> Result<()> {
    wr.write_event(Event::End(BytesStart::new(tag).to_end())).map_err(xml)
}

/// SGML-парсеры OFX не знают &apos; и &quot;, поэтому экранируются только <, > и &.
fn leaf<W: Write>(wr: &mut Writer<W>, tag: &str, text: &str) -> Result<()> {
    open(wr, tag)?;
    wr.write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))
        .map_err(xml)?;
    close(wr, tag)
}

/// 20240102093000.000[+0:UTC]
pub fn ofx_datetime(t: &DateTime<Utc>) -> String {
    format!("{}[+0:UTC]", t.format("%Y%m%d%H%M%S%.3f"))
}

pub fn ofx_date(d: NaiveDate) -> String {
    format!("{}000000.000[+0:UTC]", d.format("%Y%m%d"))
}

fn amount(d: Decimal) -> String {
    d.to_string()
}

fn structural(aggregate: &str, element: &str) -> OfxGenError {
    OfxGenError::Xml(format!("{aggregate}: required element {element} is missing"))
}

fn xml<E: std::fmt::Display>(e: E) -> OfxGenError {
    OfxGenError::Xml(e.to_string())
}
