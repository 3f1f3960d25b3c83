//! Portal constants, credentials and search parameters.

use crate::errors::AutomationError;

/// Login page of the PJE portal of the Bahia state court.
pub const LOGIN_URL: &str = "https://pje.tjba.jus.br/pje/login.seam";

/// Court unit preselected in the search form when the caller gives none.
pub const DEFAULT_COURT_UNIT: &str = "0216";

/// Where exports and screenshots land unless overridden.
pub const DEFAULT_OUTPUT_DIR: &str = "./docs";

/// Selectors for the PJE portal, grouped by screen.
pub mod selectors {
    // Login lives inside the SSO frame.
    pub const SSO_FRAME: &str = "id:ssoFrame";
    pub const USERNAME_FIELD: &str = "id:username";
    pub const PASSWORD_FIELD: &str = "id:password";
    pub const LOGIN_BUTTON: &str = "id:kc-login";
    pub const SKIP_TOKEN_LINK: &str = "linktext:Prosseguir sem o Token";

    // Post-login shell.
    pub const NG_FRAME: &str = "id:ngFrame";
    pub const PROFILE_DROPDOWN: &str = "classname:dropdown-toggle";
    pub const SEARCH_MENU_ICON: &str = "css:li#liConsultaProcessual i.fas";

    // Search form, inside its own frame.
    pub const SEARCH_FRAME: &str = "id:frameConsultaProcessual";
    pub const COURT_UNIT_FIELD: &str = "id:fPP:numeroProcesso:NumeroOrgaoJustica";
    pub const OAB_NUMBER_FIELD: &str = "id:fPP:decorationDados:numeroOAB";
    pub const OAB_STATE_SELECT: &str = "id:fPP:decorationDados:ufOABCombo";
    pub const CASE_CLASS_FIELD: &str = "id:fPP:j_id245:classeJudicial";
    pub const PARTY_NAME_FIELD: &str = "id:fPP:j_id150:nomeParte";
    pub const SEARCH_SUBMIT: &str = "id:fPP:searchProcessos";

    // Results table and pagination.
    pub const RESULTS_TABLE_BODY: &str = "id:fPP:processosTable:tb";
    pub const RESULT_ROW_LINK: &str = "css:a.btn-link.btn-condensed";
    pub const RESULTS_LABEL: &str = "xpath://table[contains(@id, 'processosTable')]//tfoot//span[contains(text(), 'resultados encontrados')]";
    pub const NEXT_PAGE_BUTTON: &str = "xpath://td[contains(@onclick, 'next')]";
    pub const BUSY_OVERLAY: &str = "id:j_id136:modalStatusCDiv";

    // Tag search screen, inside the shell frame.
    pub const TAG_MENU: &str =
        "xpath:/html/body/app-root/selector/div/div/div[1]/side-bar/nav/ul/li[5]/a";
    pub const TAG_SEARCH_INPUT: &str = "id:itPesquisarEtiquetas";
    pub const TAG_SEARCH_BUTTON: &str = "xpath:/html/body/app-root/selector/div/div/div[2]/right-panel/div/etiquetas/div[1]/div/div[1]/div[2]/div[1]/span/button[1]";
    pub const TAG_RESULT_ENTRY: &str = "xpath:/html/body/app-root/selector/div/div/div[2]/right-panel/div/etiquetas/div[1]/div/div[2]/ul/p-datalist/div/div/ul/li/div/li/div[2]/span/span";
    pub const TAG_CARD_NUMBER: &str = "xpath://processo-datalist-card//a/div/span[2]";

    // Case window navigation towards the party data view.
    pub const PROCESS_NAVBAR_MENU: &str = r#"xpath://*[@id="navbar"]/ul/li/a[1]"#;
    pub const PARTY_DATA_LINK: &str =
        "xpath:/html/body/div/div[1]/div/form/ul/li/ul/li/div[4]/table/tbody/tr/td/a";
    pub const PARTY_DATA_FRAME: &str = "tag:iframe";

    // Party detail view, inside the data window's first iframe.
    pub const PARTY_CPF: &str = r#"xpath://*[@id="pessoaFisicaViewView:j_id58"]/div/div[2]"#;
    pub const PARTY_CIVIL_NAME: &str = r#"xpath://*[@id="pessoaFisicaViewView:j_id80"]/div/div[2]"#;
    pub const PARTY_BIRTH_DATE: &str =
        r#"xpath://*[@id="pessoaFisicaViewView:j_id157"]/div/div[2]"#;
    pub const PARTY_FATHER: &str = r#"xpath://*[@id="pessoaFisicaViewView:j_id168"]/div/div[2]"#;
    pub const PARTY_MOTHER: &str = r#"xpath://*[@id="pessoaFisicaViewView:j_id179"]/div/div[2]"#;
}

/// Portal credentials. Never logged.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    /// Profile to assume after login, e.g. a prosecutor role. `None` keeps
    /// the default profile.
    pub profile: Option<String>,
}

impl Credentials {
    /// Read credentials from `PJE_USER`, `PJE_PASSWORD` and optionally
    /// `PJE_PROFILE`.
    pub fn from_env() -> Result<Self, AutomationError> {
        let user = require_env("PJE_USER")?;
        let password = require_env("PJE_PASSWORD")?;
        let profile = std::env::var("PJE_PROFILE").ok().filter(|p| !p.is_empty());
        Ok(Self {
            user,
            password,
            profile,
        })
    }
}

fn require_env(name: &str) -> Result<String, AutomationError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AutomationError::InvalidArgument(format!("environment variable {name} is not set"))
        })
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

/// Lawyer registration filter: OAB number plus the two-letter state code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OabFilter {
    pub number: String,
    pub state_code: String,
}

/// Parameters for one case search. Only fields with values are filled in
/// on the form. Setting `tag` selects the tag-search screen instead of the
/// general search form; the form filters are not applicable there.
#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    pub case_class: Option<String>,
    pub party_name: Option<String>,
    pub court_unit: Option<String>,
    pub oab: Option<OabFilter>,
    pub tag: Option<String>,
}

impl SearchConfig {
    /// Build a config, rejecting a half-specified OAB filter up front
    /// rather than submitting a search the portal will ignore.
    pub fn new(
        case_class: Option<String>,
        party_name: Option<String>,
        court_unit: Option<String>,
        oab_number: Option<String>,
        oab_state: Option<String>,
    ) -> Result<Self, AutomationError> {
        let oab = match (oab_number, oab_state) {
            (Some(number), Some(state_code)) => Some(OabFilter { number, state_code }),
            (None, None) => None,
            _ => {
                return Err(AutomationError::InvalidArgument(
                    "OAB filter requires both the number and the state code".into(),
                ))
            }
        };
        Ok(Self {
            case_class,
            party_name,
            court_unit,
            oab,
            tag: None,
        })
    }

    /// Search by portal tag instead of the general form filters.
    pub fn for_tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    pub fn court_unit(&self) -> &str {
        self.court_unit.as_deref().unwrap_or(DEFAULT_COURT_UNIT)
    }
}
