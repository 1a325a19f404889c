use chrono::{Datelike, Days, Months, NaiveDate};
use shared::{RecurrenceFrequency, RecurrenceStatus, RecurringRule};

/// Active means switched on and in the `ativa` state
pub fn is_active(rule: &RecurringRule) -> bool {
    rule.ativo && rule.status_regra.is(RecurrenceStatus::Ativa)
}

/// Past its end date or out of executions
pub fn is_expired(rule: &RecurringRule, today: NaiveDate) -> bool {
    if rule.data_fim.is_some_and(|data_fim| today > data_fim) {
        return true;
    }
    matches!(rule.max_execucoes, Some(max) if max > 0 && rule.total_execucoes >= max)
}

/// Next date the rule fires, counted from `today`.
///
/// Month arithmetic clamps to the end of shorter months, and a monthly
/// `dia_do_mes` that does not exist in the target month falls back to the
/// month's last day. Rules with an unrecognized stored frequency never fire.
pub fn next_execution(rule: &RecurringRule, today: NaiveDate) -> Option<NaiveDate> {
    if !is_active(rule) || is_expired(rule, today) {
        return None;
    }

    let intervalo = rule.intervalo.max(1);
    match rule.frequencia.known()? {
        RecurrenceFrequency::Diario => today.checked_add_days(Days::new(u64::from(intervalo))),
        RecurrenceFrequency::Semanal => {
            today.checked_add_days(Days::new(7 * u64::from(intervalo)))
        }
        RecurrenceFrequency::Mensal => {
            let next = today.checked_add_months(Months::new(intervalo))?;
            match rule.dia_do_mes {
                Some(day) => Some(pin_day(next, day)),
                None => Some(next),
            }
        }
        RecurrenceFrequency::Trimestral => today.checked_add_months(Months::new(3 * intervalo)),
        RecurrenceFrequency::Anual => today.checked_add_months(Months::new(12 * intervalo)),
    }
}

fn pin_day(date: NaiveDate, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), day).unwrap_or_else(|| last_day_of_month(date))
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let first = date.with_day(1).unwrap_or(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next_month| next_month.pred_opt())
        .unwrap_or(date)
}

#[derive(Debug, thiserror::Error)]
pub enum RecurringRuleValidationError {
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Amount must be positive")]
    NonPositiveAmount,
    #[error("Interval must be between 1 and 12")]
    IntervalOutOfRange,
    #[error("Day of month must be between 1 and 31")]
    DayOfMonthOutOfRange,
    #[error("End date cannot be before the start date")]
    EndBeforeStart,
}
