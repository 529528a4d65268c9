//! Account subjects and the rules that select them.
//!
//! A [`RuleCatalog`] is built once, checked by [`RuleCatalog::validate`] when an
//! engine is constructed, and only read afterwards.

use crate::error::{ClassifierError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

/// Top-level accounting category of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Revenue,
    Expense,
    Asset,
    Liability,
    Equity,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Revenue => "revenue",
            Category::Expense => "expense",
            Category::Asset => "asset",
            Category::Liability => "liability",
            Category::Equity => "equity",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed predicate over a transaction record.
///
/// How each kind compares its value against the record lives in
/// [`crate::matcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Rule {
    /// Exact match on the patient/insurance type.
    PatientType(String),
    /// Containment, either direction, on the patient/insurance type.
    InsuranceType(String),
    /// Exact match on the department.
    Department(String),
    /// Contained in the item description.
    ServiceType(String),
    /// Contained in the item description.
    ItemCategory(String),
    /// Contained in the vendor name.
    VendorType(String),
    /// Contained in the vendor name.
    Vendor(String),
    /// Contained in the item description.
    ExpenseType(String),
    /// Holds when the record carries no patient/insurance type.
    NoInsurance(bool),
    /// Catch-all for the miscellaneous subject of a category.
    Default(bool),
}

impl Rule {
    pub fn kind(&self) -> &'static str {
        match self {
            Rule::PatientType(_) => "patient_type",
            Rule::InsuranceType(_) => "insurance_type",
            Rule::Department(_) => "department",
            Rule::ServiceType(_) => "service_type",
            Rule::ItemCategory(_) => "item_category",
            Rule::VendorType(_) => "vendor_type",
            Rule::Vendor(_) => "vendor",
            Rule::ExpenseType(_) => "expense_type",
            Rule::NoInsurance(_) => "no_insurance",
            Rule::Default(_) => "default",
        }
    }

    /// Returns `true` for an enabled catch-all rule.
    pub fn is_catch_all(&self) -> bool {
        matches!(self, Rule::Default(true))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::PatientType(v)
            | Rule::InsuranceType(v)
            | Rule::Department(v)
            | Rule::ServiceType(v)
            | Rule::ItemCategory(v)
            | Rule::VendorType(v)
            | Rule::Vendor(v)
            | Rule::ExpenseType(v) => write!(f, "{}={}", self.kind(), v),
            Rule::NoInsurance(flag) | Rule::Default(flag) => write!(f, "{}={}", self.kind(), flag),
        }
    }
}

fn default_active() -> bool {
    true
}

/// A named bucket of the accounting taxonomy, e.g. 건보수익 or 의약품비.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSubject {
    pub code: String,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl AccountSubject {
    /// Creates an active subject with no keywords or rules.
    pub fn new(code: &str, name: &str, category: Category, subcategory: &str) -> Self {
        AccountSubject {
            code: code.to_string(),
            name: name.to_string(),
            category,
            subcategory: subcategory.to_string(),
            description: String::new(),
            keywords: Vec::new(),
            rules: Vec::new(),
            is_active: true,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Adds keywords, skipping blanks and ones already present.
    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        for kw in keywords {
            let kw = kw.trim();
            if !kw.is_empty() && !self.keywords.iter().any(|k| k == kw) {
                self.keywords.push(kw.to_string());
            }
        }
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Returns `true` if this subject owns an enabled catch-all rule.
    pub fn is_catch_all(&self) -> bool {
        self.rules.iter().any(Rule::is_catch_all)
    }
}

/// The immutable set of account subjects available to an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleCatalog {
    subjects: Vec<AccountSubject>,
}

impl RuleCatalog {
    /// Wraps a list of subjects. Declaration order is kept and breaks score ties.
    pub fn new(subjects: Vec<AccountSubject>) -> Self {
        RuleCatalog { subjects }
    }

    /// Parses a catalog from a JSON array of subjects.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let subjects: Vec<AccountSubject> = serde_json::from_str(json)?;
        Ok(RuleCatalog::new(subjects))
    }

    /// Loads a catalog from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Checks the catalog is usable for classification.
    ///
    /// Rejects an empty catalog, blank or duplicate codes, blank names, and a
    /// revenue or expense category that has active subjects but no active
    /// catch-all subject.
    pub fn validate(&self) -> Result<()> {
        if self.subjects.is_empty() {
            return Err(ClassifierError::Configuration(
                "rule catalog is empty".to_string(),
            ));
        }

        let mut codes = HashSet::new();
        for (idx, subject) in self.subjects.iter().enumerate() {
            if subject.code.trim().is_empty() {
                return Err(ClassifierError::Configuration(format!(
                    "subject #{} has an empty code",
                    idx
                )));
            }
            if subject.name.trim().is_empty() {
                return Err(ClassifierError::Configuration(format!(
                    "subject {} has an empty name",
                    subject.code
                )));
            }
            if !codes.insert(subject.code.as_str()) {
                return Err(ClassifierError::Configuration(format!(
                    "duplicate subject code {}",
                    subject.code
                )));
            }
        }

        if !self.subjects.iter().any(|s| s.is_active) {
            return Err(ClassifierError::Configuration(
                "rule catalog has no active subjects".to_string(),
            ));
        }

        for category in [Category::Revenue, Category::Expense] {
            let mut candidates = self.candidates(category).peekable();
            if candidates.peek().is_none() {
                continue;
            }
            if !candidates.any(AccountSubject::is_catch_all) {
                return Err(ClassifierError::Configuration(format!(
                    "category {} has no catch-all (default) subject",
                    category
                )));
            }
        }

        Ok(())
    }

    /// Active subjects of a category, in declaration order.
    pub fn candidates(&self, category: Category) -> impl Iterator<Item = &AccountSubject> {
        self.subjects
            .iter()
            .filter(move |s| s.is_active && s.category == category)
    }

    pub fn subjects(&self) -> &[AccountSubject] {
        &self.subjects
    }

    pub fn find_by_name(&self, name: &str) -> Option<&AccountSubject> {
        self.subjects.iter().find(|s| s.name == name)
    }

    pub fn find_by_code(&self, code: &str) -> Option<&AccountSubject> {
        self.subjects.iter().find(|s| s.code == code)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// The built-in hospital taxonomy.
    pub fn hospital_default() -> Self {
        RuleCatalog::new(hospital_subjects())
    }
}

fn hospital_subjects() -> Vec<AccountSubject> {
    use Category::{Asset, Expense, Revenue};

    vec![
        // Revenue
        AccountSubject::new("R101", "건보수익", Revenue, "의료수익")
            .with_description("건강보험 환자 진료수익")
            .with_keywords(&["건강보험", "건보", "진료", "외래", "입원", "공단"])
            .with_rule(Rule::PatientType("건강보험".to_string()))
            .with_rule(Rule::InsuranceType("건보".to_string()))
            .with_rule(Rule::ServiceType("진료".to_string())),
        AccountSubject::new("R102", "의료급여수익", Revenue, "의료수익")
            .with_description("의료급여 환자 진료수익")
            .with_keywords(&["의료급여", "보호", "급여환자"])
            .with_rule(Rule::PatientType("의료급여".to_string()))
            .with_rule(Rule::InsuranceType("급여".to_string())),
        AccountSubject::new("R103", "자보수익", Revenue, "의료수익")
            .with_description("자동차보험 환자 진료수익")
            .with_keywords(&["자동차보험", "자보", "교통사고"])
            .with_rule(Rule::PatientType("자동차보험".to_string()))
            .with_rule(Rule::InsuranceType("자보".to_string()))
            .with_rule(Rule::InsuranceType("자동차".to_string())),
        AccountSubject::new("R104", "일반수익", Revenue, "의료수익")
            .with_description("비급여 및 일반 환자 수익")
            .with_keywords(&["일반", "비급여", "본인부담"])
            .with_rule(Rule::PatientType("일반".to_string()))
            .with_rule(Rule::NoInsurance(true))
            .with_rule(Rule::ServiceType("비급여".to_string())),
        AccountSubject::new("R105", "검진수익", Revenue, "의료수익")
            .with_description("건강검진 수익")
            .with_keywords(&["검진", "건강검진", "종합검진"])
            .with_rule(Rule::ServiceType("검진".to_string()))
            .with_rule(Rule::Department("건강검진센터".to_string())),
        AccountSubject::new("R199", "기타수익", Revenue, "의료외수익")
            .with_description("분류되지 않은 수익")
            .with_keywords(&["기타", "잡이익", "임대", "이자"])
            .with_rule(Rule::Default(true)),
        // Expense
        AccountSubject::new("E201", "급여", Expense, "인건비")
            .with_description("직원 급여 및 상여")
            .with_keywords(&["급여", "임금", "상여", "직원", "인건비", "수당"])
            .with_rule(Rule::ExpenseType("급여".to_string()))
            .with_rule(Rule::ExpenseType("임금".to_string()))
            .with_rule(Rule::Vendor("내부".to_string())),
        AccountSubject::new("E202", "의약품비", Expense, "재료비")
            .with_description("의약품 구입비")
            .with_keywords(&["의약품", "약품", "제약", "약제", "주사제"])
            .with_rule(Rule::ItemCategory("의약품".to_string()))
            .with_rule(Rule::ItemCategory("약품".to_string()))
            .with_rule(Rule::VendorType("제약".to_string()))
            .with_rule(Rule::VendorType("약품".to_string())),
        AccountSubject::new("E203", "진료재료비", Expense, "재료비")
            .with_description("치료재료 및 의료 소모품")
            .with_keywords(&["재료", "소모품", "치료재료", "거즈", "주사기", "의료기기"])
            .with_rule(Rule::ItemCategory("재료".to_string()))
            .with_rule(Rule::ItemCategory("소모품".to_string()))
            .with_rule(Rule::VendorType("메디칼".to_string()))
            .with_rule(Rule::VendorType("의료기".to_string())),
        AccountSubject::new("E204", "외주검사비", Expense, "관리운영비")
            .with_description("외부 기관 위탁 검사비")
            .with_keywords(&["외주검사", "위탁검사", "검사료", "수탁"])
            .with_rule(Rule::ExpenseType("외주검사".to_string()))
            .with_rule(Rule::ExpenseType("위탁검사".to_string()))
            .with_rule(Rule::VendorType("의료재단".to_string())),
        AccountSubject::new("E205", "임차료", Expense, "관리운영비")
            .with_description("건물 및 장비 임차료")
            .with_keywords(&["임차료", "임대료", "월세", "관리비"])
            .with_rule(Rule::ExpenseType("임차".to_string()))
            .with_rule(Rule::ExpenseType("임대료".to_string()))
            .with_rule(Rule::ExpenseType("월세".to_string())),
        AccountSubject::new("E206", "수도광열비", Expense, "관리운영비")
            .with_description("전기, 가스, 수도 요금")
            .with_keywords(&["전기료", "가스비", "수도료", "난방", "한전"])
            .with_rule(Rule::ExpenseType("전기".to_string()))
            .with_rule(Rule::ExpenseType("가스".to_string()))
            .with_rule(Rule::ExpenseType("수도".to_string()))
            .with_rule(Rule::VendorType("한국전력".to_string())),
        AccountSubject::new("E207", "지급수수료", Expense, "관리운영비")
            .with_description("카드, 은행, 대행 수수료")
            .with_keywords(&["수수료", "카드수수료", "이체", "대행"])
            .with_rule(Rule::ExpenseType("수수료".to_string()))
            .with_rule(Rule::VendorType("카드".to_string()))
            .with_rule(Rule::VendorType("은행".to_string())),
        AccountSubject::new("E299", "기타비용", Expense, "관리운영비")
            .with_description("분류되지 않은 비용")
            .with_keywords(&["기타", "잡비"])
            .with_rule(Rule::Default(true)),
        // Balance sheet
        AccountSubject::new("A301", "의료미수금", Asset, "유동자산")
            .with_description("공단 청구 후 미수령 진료비")
            .with_keywords(&["미수금", "청구"])
            .with_rule(Rule::InsuranceType("청구".to_string())),
    ]
}
