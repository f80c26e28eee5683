//! Сборка документа: signon, список бумаг и одна инвестиционная выписка.

use crate::{
    config::ConverterConfig,
    model::{
        Document, InvestmentAccount, InvestmentStatement, Signon, StatementPeriod, Status,
        Transaction,
    },
    securities::SecurityRegistry,
};
use chrono::{DateTime, Utc};

/// TRNUID ответа; выписка не отвечает ни на какой запрос.
pub const TRN_UID: &str = "0";

/// Только упаковка: всё уже проверено на предыдущих шагах.
/// Без строк с датой период схлопывается в момент `now`.
pub fn assemble(
    registry: &SecurityRegistry,
    transactions: Vec<Transaction>,
    period: Option<StatementPeriod>,
    account_id: &str,
    cfg: &ConverterConfig,
    now: DateTime<Utc>,
) -> Document {
    Document {
        signon: Signon {
            status: Status::success(),
            server_time: now,
            language: cfg.language.clone(),
            institution: cfg.institution.clone(),
        },
        securities: registry.iter().cloned().collect(),
        statement: InvestmentStatement {
            trn_uid: TRN_UID.into(),
            status: Status::success(),
            as_of: now,
            currency: cfg.currency.clone(),
            account: InvestmentAccount {
                broker_id: cfg.broker_id.clone(),
                account_id: account_id.to_string(),
            },
            period: period.unwrap_or_else(|| StatementPeriod::at(now)),
            transactions,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;
    use chrono::TimeZone;

    #[test]
    fn packs_registry_and_metadata() {
        let mut registry = SecurityRegistry::new();
        registry.register("VTI", "VANGUARD TOTAL STOCK MKT");
        registry.register("AAPL", "APPLE INC");

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let period = StatementPeriod {
            start: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        };
        let cfg = ConverterConfig::default();
        let doc = assemble(&registry, Vec::new(), Some(period), "9554419996", &cfg, now);

        assert_eq!(doc.signon.status.code, 0);
        assert_eq!(doc.signon.status.severity, Severity::Info);
        assert_eq!(doc.signon.server_time, now);
        assert_eq!(doc.signon.language, "ENG");
        assert_eq!(doc.signon.institution.org, "Fidelity Investments");
        assert_eq!(doc.signon.institution.fid, "07776");

        let tickers: Vec<_> = doc.securities.iter().map(|s| s.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["VTI", "AAPL"]);

        let st = &doc.statement;
        assert_eq!(st.trn_uid, "0");
        assert_eq!(st.as_of, now);
        assert_eq!(st.currency, "USD");
        assert_eq!(st.account.broker_id, "fidelity.com");
        assert_eq!(st.account.account_id, "9554419996");
        assert_eq!(st.period, period);
    }

    #[test]
    fn empty_statement_period_falls_back_to_now() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let doc = assemble(
            &SecurityRegistry::new(),
            Vec::new(),
            None,
            "1",
            &ConverterConfig::default(),
            now,
        );
        assert_eq!(doc.statement.period, StatementPeriod::at(now));
        assert!(doc.securities.is_empty());
    }
}
