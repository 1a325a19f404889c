use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A closed domain vocabulary whose serde form is the modern (Portuguese) token.
///
/// `CONCEPT` names the vocabulary table the backend registers for this enum;
/// the backend refuses to start when the two disagree.
pub trait VocabularyEnum: Sized + Copy + fmt::Debug + 'static {
    const CONCEPT: &'static str;

    /// Modern token for this variant
    fn canonical(&self) -> &'static str;

    /// Every variant, in declaration order
    fn variants() -> &'static [Self];

    fn from_canonical(token: &str) -> Option<Self> {
        Self::variants()
            .iter()
            .copied()
            .find(|variant| variant.canonical() == token)
    }
}

macro_rules! vocabulary_enum {
    (
        $(#[$meta:meta])*
        $name:ident => $concept:literal {
            $($variant:ident => $token:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $token)]
                $variant,
            )+
        }

        impl VocabularyEnum for $name {
            const CONCEPT: &'static str = $concept;

            fn canonical(&self) -> &'static str {
                match self {
                    $(Self::$variant => $token,)+
                }
            }

            fn variants() -> &'static [Self] {
                &[$(Self::$variant),+]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.canonical())
            }
        }
    };
}

vocabulary_enum! {
    /// Kind of financial account
    AccountType => "AccountType" {
        Dinheiro => "dinheiro",
        ContaCorrente => "conta_corrente",
        Poupanca => "poupanca",
        CartaoCredito => "cartao_credito",
        Investimento => "investimento",
        Outros => "outros",
    }
}

vocabulary_enum! {
    /// Whether a category groups income or spending
    CategoryType => "CategoryType" {
        Receita => "receita",
        Despesa => "despesa",
    }
}

vocabulary_enum! {
    TransactionType => "TransactionType" {
        Receita => "receita",
        Despesa => "despesa",
        Transferencia => "transferencia",
    }
}

vocabulary_enum! {
    /// Clearing state of a transaction
    TransactionStatus => "TransactionStatus" {
        Pendente => "pendente",
        Compensada => "compensada",
        Conciliada => "conciliada",
    }
}

vocabulary_enum! {
    PaymentMethod => "PaymentMethod" {
        Dinheiro => "dinheiro",
        Pix => "pix",
        CartaoDebito => "cartao_debito",
        CartaoCredito => "cartao_credito",
        Boleto => "boleto",
        Transferencia => "transferencia",
        Cheque => "cheque",
        Outros => "outros",
    }
}

vocabulary_enum! {
    /// Budget state derived from how much of the planned amount was spent
    BudgetStatus => "BudgetStatus" {
        Ativo => "ativo",
        Pausado => "pausado",
        Concluido => "concluido",
        Excedido => "excedido",
    }
}

vocabulary_enum! {
    RecurrenceFrequency => "RecurrenceFrequency" {
        Diario => "diario",
        Semanal => "semanal",
        Mensal => "mensal",
        Trimestral => "trimestral",
        Anual => "anual",
    }
}

vocabulary_enum! {
    RecurrenceStatus => "RecurrenceStatus" {
        Ativa => "ativa",
        Pausada => "pausada",
        Concluida => "concluida",
        Cancelada => "cancelada",
    }
}

/// An enum value read back from storage.
///
/// Rows written before input validation existed may hold tokens that no
/// vocabulary recognizes. Those are kept verbatim so the read path never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persisted<T> {
    Known(T),
    Unrecognized(String),
}

impl<T: VocabularyEnum> Persisted<T> {
    pub fn known(&self) -> Option<T> {
        match self {
            Persisted::Known(value) => Some(*value),
            Persisted::Unrecognized(_) => None,
        }
    }

    pub fn is(&self, expected: T) -> bool
    where
        T: PartialEq,
    {
        self.known() == Some(expected)
    }

    /// Token written to storage and to the wire
    pub fn as_str(&self) -> &str {
        match self {
            Persisted::Known(value) => value.canonical(),
            Persisted::Unrecognized(raw) => raw,
        }
    }
}

impl<T> From<T> for Persisted<T> {
    fn from(value: T) -> Self {
        Persisted::Known(value)
    }
}

impl<T: VocabularyEnum> Serialize for Persisted<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de, T: VocabularyEnum> Deserialize<'de> for Persisted<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match T::from_canonical(&raw) {
            Some(value) => Persisted::Known(value),
            None => Persisted::Unrecognized(raw),
        })
    }
}

/// Helpers for query-string fields, which always arrive as strings.
pub mod query_format {
    use serde::{de, Deserialize, Deserializer};
    use std::fmt::Display;
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
        Flag(bool),
    }

    /// Accepts `"42"`, `42`, `"true"`, `true`; blank strings become `None`.
    pub fn option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
        T::Err: Display,
    {
        let text = match Option::<Raw>::deserialize(deserializer)? {
            None => return Ok(None),
            Some(Raw::Text(text)) => text,
            Some(Raw::Number(number)) => number.to_string(),
            Some(Raw::Flag(flag)) => flag.to_string(),
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        trimmed.parse().map(Some).map_err(de::Error::custom)
    }
}

fn default_currency() -> String {
    "BRL".to_string()
}

fn default_true() -> bool {
    true
}

// ----- Accounts ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub usuario_id: String,
    pub nome: String,
    pub tipo: Persisted<AccountType>,
    pub saldo_inicial: f64,
    /// Opening balance plus every transaction posted to the account
    pub saldo_atual: f64,
    pub moeda: String,
    pub ativo: bool,
    pub incluir_relatorios: bool,
    pub descricao: Option<String>,
    pub cor: Option<String>,
    pub icone: Option<String>,
    pub limite_credito: Option<f64>,
    pub dados_demo: bool,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub usuario_id: String,
    pub nome: String,
    pub tipo: AccountType,
    #[serde(default)]
    pub saldo_inicial: f64,
    #[serde(default = "default_currency")]
    pub moeda: String,
    #[serde(default = "default_true")]
    pub ativo: bool,
    #[serde(default = "default_true")]
    pub incluir_relatorios: bool,
    pub descricao: Option<String>,
    pub cor: Option<String>,
    pub icone: Option<String>,
    pub limite_credito: Option<f64>,
    #[serde(default)]
    pub dados_demo: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateAccountRequest {
    pub nome: Option<String>,
    pub tipo: Option<AccountType>,
    pub ativo: Option<bool>,
    pub incluir_relatorios: Option<bool>,
    pub descricao: Option<String>,
    pub cor: Option<String>,
    pub icone: Option<String>,
    pub limite_credito: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountListQuery {
    pub usuario_id: Option<String>,
    pub tipo: Option<AccountType>,
    #[serde(default, deserialize_with = "query_format::option")]
    pub ativo: Option<bool>,
}

// ----- Categories --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub usuario_id: String,
    pub nome: String,
    pub tipo: Persisted<CategoryType>,
    pub categoria_pai_id: Option<String>,
    pub cor: Option<String>,
    pub icone: Option<String>,
    pub descricao: Option<String>,
    pub ativo: bool,
    pub dados_demo: bool,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub usuario_id: String,
    pub nome: String,
    pub tipo: CategoryType,
    pub categoria_pai_id: Option<String>,
    pub cor: Option<String>,
    pub icone: Option<String>,
    pub descricao: Option<String>,
    #[serde(default = "default_true")]
    pub ativo: bool,
    #[serde(default)]
    pub dados_demo: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryListQuery {
    pub usuario_id: Option<String>,
    pub tipo: Option<CategoryType>,
}

/// Partial update; a category keeps its type for life
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateCategoryRequest {
    pub nome: Option<String>,
    pub categoria_pai_id: Option<String>,
    pub cor: Option<String>,
    pub icone: Option<String>,
    pub descricao: Option<String>,
    pub ativo: Option<bool>,
}

/// One active category with its active subcategories, nested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTreeNode {
    pub id: String,
    pub nome: String,
    pub cor: Option<String>,
    pub icone: Option<String>,
    pub descricao: Option<String>,
    pub subcategorias: Vec<CategoryTreeNode>,
}

// ----- Transactions ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub usuario_id: String,
    pub conta_id: String,
    pub categoria_id: Option<String>,
    pub tipo: Persisted<TransactionType>,
    pub valor: f64,
    pub moeda: String,
    pub data_lancamento: NaiveDate,
    pub data_competencia: Option<NaiveDate>,
    pub descricao: String,
    pub observacoes: Option<String>,
    pub status: Persisted<TransactionStatus>,
    pub metodo_pagamento: Option<Persisted<PaymentMethod>>,
    pub tags: Vec<String>,
    pub anexo_url: Option<String>,
    pub anexo_nome: Option<String>,
    pub conta_transferencia_id: Option<String>,
    pub transacao_transferencia_id: Option<String>,
    pub regra_recorrente_id: Option<String>,
    pub referencia_bancaria: Option<String>,
    pub dados_demo: bool,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    pub usuario_id: String,
    pub conta_id: String,
    pub categoria_id: Option<String>,
    pub tipo: TransactionType,
    pub valor: f64,
    #[serde(default = "default_currency")]
    pub moeda: String,
    pub data_lancamento: NaiveDate,
    pub data_competencia: Option<NaiveDate>,
    pub descricao: String,
    pub observacoes: Option<String>,
    pub status: Option<TransactionStatus>,
    pub metodo_pagamento: Option<PaymentMethod>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub anexo_url: Option<String>,
    pub anexo_nome: Option<String>,
    pub conta_transferencia_id: Option<String>,
    pub regra_recorrente_id: Option<String>,
    pub referencia_bancaria: Option<String>,
    #[serde(default)]
    pub dados_demo: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTransactionRequest {
    pub categoria_id: Option<String>,
    pub valor: Option<f64>,
    pub data_lancamento: Option<NaiveDate>,
    pub data_competencia: Option<NaiveDate>,
    pub descricao: Option<String>,
    pub observacoes: Option<String>,
    pub status: Option<TransactionStatus>,
    pub metodo_pagamento: Option<PaymentMethod>,
    pub tags: Option<Vec<String>>,
    pub referencia_bancaria: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionListQuery {
    pub usuario_id: Option<String>,
    pub tipo: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub conta_id: Option<String>,
    pub categoria_id: Option<String>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
    #[serde(default, deserialize_with = "query_format::option")]
    pub skip: Option<u32>,
    #[serde(default, deserialize_with = "query_format::option")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub total_transacoes: u32,
    pub total_receitas: f64,
    pub total_despesas: f64,
    pub saldo_periodo: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummaryQuery {
    pub usuario_id: Option<String>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
}

// ----- Budgets -----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: String,
    pub usuario_id: String,
    pub categoria_id: String,
    pub ano: i32,
    pub mes: u32,
    pub valor_planejado: f64,
    /// Expenses posted to the category during the budget month
    pub valor_realizado: f64,
    pub percentual_utilizado: f64,
    pub valor_restante: f64,
    pub status: BudgetStatus,
    pub ativo: bool,
    pub alerta_percentual: u32,
    pub descricao: Option<String>,
    pub dados_demo: bool,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBudgetRequest {
    pub usuario_id: String,
    pub categoria_id: String,
    pub ano: i32,
    pub mes: u32,
    pub valor_planejado: f64,
    #[serde(default = "default_true")]
    pub ativo: bool,
    pub alerta_percentual: Option<u32>,
    pub descricao: Option<String>,
    #[serde(default)]
    pub dados_demo: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetListQuery {
    pub usuario_id: Option<String>,
    #[serde(default, deserialize_with = "query_format::option")]
    pub ano: Option<i32>,
    #[serde(default, deserialize_with = "query_format::option")]
    pub mes: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateBudgetRequest {
    pub valor_planejado: Option<f64>,
    pub ativo: Option<bool>,
    pub alerta_percentual: Option<u32>,
    pub descricao: Option<String>,
}

/// Whose budgets to copy into a month
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CopyBudgetsQuery {
    pub usuario_id: Option<String>,
}

// ----- Recurring rules ---------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringRule {
    pub id: String,
    pub usuario_id: String,
    pub conta_id: String,
    pub categoria_id: Option<String>,
    pub nome: String,
    pub descricao_template: String,
    pub tipo: Persisted<TransactionType>,
    pub valor: f64,
    pub metodo_pagamento: Option<Persisted<PaymentMethod>>,
    pub frequencia: Persisted<RecurrenceFrequency>,
    pub intervalo: u32,
    pub dia_do_mes: Option<u32>,
    pub data_inicio: NaiveDate,
    pub data_fim: Option<NaiveDate>,
    pub status_regra: Persisted<RecurrenceStatus>,
    pub ativo: bool,
    pub max_execucoes: Option<u32>,
    pub total_execucoes: u32,
    pub proxima_execucao: Option<NaiveDate>,
    pub dados_demo: bool,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRecurringRuleRequest {
    pub usuario_id: String,
    pub conta_id: String,
    pub categoria_id: Option<String>,
    pub nome: String,
    pub descricao_template: String,
    pub tipo: TransactionType,
    pub valor: f64,
    pub metodo_pagamento: Option<PaymentMethod>,
    pub frequencia: RecurrenceFrequency,
    pub intervalo: Option<u32>,
    pub dia_do_mes: Option<u32>,
    pub data_inicio: NaiveDate,
    pub data_fim: Option<NaiveDate>,
    pub status_regra: Option<RecurrenceStatus>,
    #[serde(default = "default_true")]
    pub ativo: bool,
    pub max_execucoes: Option<u32>,
    #[serde(default)]
    pub dados_demo: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecurringRuleListQuery {
    pub usuario_id: Option<String>,
    pub frequencia: Option<RecurrenceFrequency>,
    pub status_regra: Option<RecurrenceStatus>,
}

/// Partial update; account, type and frequency are fixed once created
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecurringRuleRequest {
    pub nome: Option<String>,
    pub descricao_template: Option<String>,
    pub valor: Option<f64>,
    pub metodo_pagamento: Option<PaymentMethod>,
    pub dia_do_mes: Option<u32>,
    pub data_fim: Option<NaiveDate>,
    pub status_regra: Option<RecurrenceStatus>,
    pub ativo: Option<bool>,
    pub max_execucoes: Option<u32>,
}

// ----- Dashboard ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub ano: i32,
    pub mes: u32,
    pub saldo_total: f64,
    pub receitas_mes: f64,
    pub despesas_mes: f64,
    pub economia_mes: f64,
    /// Percent change against the previous month, 0 when there is no baseline
    pub variacao_receitas: f64,
    pub variacao_despesas: f64,
    pub gastos_por_categoria: Vec<CategorySpending>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpending {
    pub categoria_id: Option<String>,
    pub categoria: String,
    pub cor: Option<String>,
    pub valor: f64,
    pub quantidade: u32,
    pub percentual: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardQuery {
    pub usuario_id: Option<String>,
    #[serde(default, deserialize_with = "query_format::option")]
    pub ano: Option<i32>,
    #[serde(default, deserialize_with = "query_format::option")]
    pub mes: Option<u32>,
}

// ----- Vocabulary --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPairDto {
    pub legado: String,
    pub moderno: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptEntry {
    pub nome: String,
    pub forma_canonica: String,
    pub pares: Vec<TokenPairDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldBindingDto {
    pub campo: String,
    pub conceito: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeEntry {
    pub escopo: String,
    pub aliases: Vec<TokenPairDto>,
    pub campos_enum: Vec<FieldBindingDto>,
}

/// Everything a client needs to translate between the two vocabularies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyCatalog {
    pub conceitos: Vec<ConceptEntry>,
    pub escopos: Vec<ScopeEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnUsage {
    pub tabela: String,
    pub coluna: String,
    pub conceito: String,
    pub modernos: u64,
    pub legados: u64,
    pub nao_reconhecidos: u64,
    pub total: u64,
}

/// How far stored rows have moved from the legacy vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyReport {
    pub colunas: Vec<ColumnUsage>,
}

// ----- Envelopes ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub itens: Vec<T>,
    pub total: u64,
    pub skip: u32,
    pub limit: u32,
}

/// Body of every 4xx/5xx response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}
