//! # Dashboard: one signed-in client
//!
//! [`Dashboard`] owns the [`SessionLifecycle`], the [`LedgerCache`] and the
//! month/year/page selection, and is what a front end drives. It keeps a single
//! visible error message: every operation clears it on success and replaces it
//! on failure, leaving session and cache untouched.
//!
//! | Area | Methods |
//! |------|---------|
//! | Session | [`start`](Dashboard::start), [`login`](Dashboard::login), [`register`](Dashboard::register), [`logout`](Dashboard::logout) |
//! | Records | [`add_expense`](Dashboard::add_expense), [`begin_edit`](Dashboard::begin_edit), [`save_expense`](Dashboard::save_expense), [`delete_expense`](Dashboard::delete_expense) |
//! | Views | [`month_view`](Dashboard::month_view), [`annual_summary`](Dashboard::annual_summary), selection and paging |
//! | Administration | [`admin_identities`](Dashboard::admin_identities), [`admin_create_identity`](Dashboard::admin_create_identity), [`admin_update_identity`](Dashboard::admin_update_identity), [`admin_delete_identity`](Dashboard::admin_delete_identity) |
//! | Any owner's records | [`admin_records`](Dashboard::admin_records), [`admin_add_expense`](Dashboard::admin_add_expense), [`admin_save_expense`](Dashboard::admin_save_expense), [`admin_delete_expense`](Dashboard::admin_delete_expense) |

use ledger::month::resolve_month_for_mutation;
use ledger::view::{annual_totals, records_for_owner, total_pages};
use ledger::{
    AnnualSummary, ExpenseForm, ExpenseRecord, Identity, LedgerApi, LedgerCache, LedgerConfig,
    LedgerError, MonthView, Role, SelectionState, ValidationError,
};
use tracing::info;

use crate::auth::{Credentials, IdentityChanges, Registration, SessionLifecycle, SessionStore};
use crate::error::{AppError, AppResult};
use crate::identity::IdentityApi;

pub struct Dashboard<L: LedgerApi, I: IdentityApi, S: SessionStore> {
    session: SessionLifecycle<I, S>,
    ledger: LedgerCache<L>,
    selection: SelectionState,
    config: LedgerConfig,
    error: Option<String>,
}

impl<L: LedgerApi, I: IdentityApi, S: SessionStore> Dashboard<L, I, S> {
    pub fn new(session: SessionLifecycle<I, S>, ledger: L, config: LedgerConfig) -> Self {
        Self {
            session,
            ledger: LedgerCache::new(ledger),
            selection: SelectionState::default(),
            config,
            error: None,
        }
    }

    /// Start on a specific month and year instead of today's.
    pub fn with_selection(mut self, selection: SelectionState) -> Self {
        self.selection = selection;
        self
    }

    pub fn session(&mut self) -> &mut SessionLifecycle<I, S> {
        &mut self.session
    }

    pub fn ledger(&self) -> &LedgerCache<L> {
        &self.ledger
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// The visible error message, if the last operation failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The signed-in identity. An expired session also empties the ledger.
    pub fn identity(&mut self) -> Option<Identity> {
        let identity = self.session.current();
        if identity.is_none() && self.ledger.owner_id().is_some() {
            self.ledger.clear();
        }
        identity
    }

    fn track<T>(&mut self, result: AppResult<T>) -> AppResult<T> {
        match &result {
            Ok(_) => self.error = None,
            Err(e) => self.error = Some(e.to_string()),
        }
        result
    }

    fn signed_in(&mut self) -> AppResult<Identity> {
        self.identity().ok_or(AppError::NotSignedIn)
    }

    fn owner(&mut self) -> AppResult<Identity> {
        let identity = self.signed_in()?;
        if identity.is_admin() {
            return Err(AppError::NoPersonalLedger);
        }
        Ok(identity)
    }

    fn admin(&mut self) -> AppResult<Identity> {
        let identity = self.signed_in()?;
        if !identity.is_admin() {
            return Err(AppError::AdminOnly);
        }
        Ok(identity)
    }

    /// Restore the persisted session, if any, and load its ledger.
    pub async fn start(&mut self) -> AppResult<Option<Identity>> {
        let result = self.start_inner().await;
        self.track(result)
    }

    async fn start_inner(&mut self) -> AppResult<Option<Identity>> {
        let identity = self.session.restore()?;
        self.ledger.load(identity.as_ref()).await?;
        Ok(identity)
    }

    pub async fn login(&mut self, credentials: &Credentials) -> AppResult<Identity> {
        let result = match self.session.login(credentials).await {
            Ok(identity) => self.after_sign_in(identity).await,
            Err(e) => Err(e.into()),
        };
        self.track(result)
    }

    pub async fn register(&mut self, registration: &Registration) -> AppResult<Identity> {
        let result = match self.session.register(registration).await {
            Ok(identity) => self.after_sign_in(identity).await,
            Err(e) => Err(e.into()),
        };
        self.track(result)
    }

    async fn after_sign_in(&mut self, identity: Identity) -> AppResult<Identity> {
        self.ledger.load(Some(&identity)).await?;
        Ok(identity)
    }

    /// End the session and drop the cached records.
    pub fn logout(&mut self) -> AppResult<()> {
        self.ledger.clear();
        let result = self.session.logout().map_err(AppError::from);
        self.track(result)
    }

    /// Replace the cached records with a fresh copy from the Ledger API.
    pub async fn reload(&mut self) -> AppResult<()> {
        let identity = self.identity();
        let result = self.ledger.load(identity.as_ref()).await.map_err(AppError::from);
        self.track(result)
    }

    /// Validate `form` and create the expense. A blank date files it under the
    /// selected month.
    pub async fn add_expense(&mut self, form: &ExpenseForm) -> AppResult<ExpenseRecord> {
        let result = self.add_expense_inner(form).await;
        self.track(result)
    }

    async fn add_expense_inner(&mut self, form: &ExpenseForm) -> AppResult<ExpenseRecord> {
        let identity = self.owner()?;
        let input = form.parse()?;
        let record = self
            .ledger
            .create(&input, &self.selection.selected_month, &identity.id)
            .await?;
        Ok(record.clone())
    }

    /// Mark `id` as being edited and return its current state.
    pub fn begin_edit(&mut self, id: &str) -> AppResult<ExpenseRecord> {
        let result: AppResult<ExpenseRecord> = self
            .ledger
            .begin_edit(id)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownRecord(id.to_string()).into());
        self.track(result)
    }

    pub fn cancel_edit(&mut self) {
        self.ledger.cancel_edit();
    }

    /// Replace the fields of record `id` with `form`.
    pub async fn save_expense(&mut self, id: &str, form: &ExpenseForm) -> AppResult<ExpenseRecord> {
        let result = self.save_expense_inner(id, form).await;
        self.track(result)
    }

    async fn save_expense_inner(&mut self, id: &str, form: &ExpenseForm) -> AppResult<ExpenseRecord> {
        let identity = self.owner()?;
        let input = form.parse()?;
        let mut record = self
            .ledger
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownRecord(id.to_string()))?;
        record.description = input.description;
        record.category = input.category;
        record.amount = input.amount;
        record.date = input.date;
        record.owner_id = identity.id;
        let record = self.ledger.update(record).await?;
        Ok(record.clone())
    }

    pub async fn delete_expense(&mut self, id: &str) -> AppResult<()> {
        let result = self.delete_expense_inner(id).await;
        self.track(result)
    }

    async fn delete_expense_inner(&mut self, id: &str) -> AppResult<()> {
        self.owner()?;
        if self.ledger.get(id).is_none() {
            return Err(LedgerError::UnknownRecord(id.to_string()).into());
        }
        self.ledger.remove(id).await?;
        Ok(())
    }

    pub fn select_month(&mut self, month: &str) {
        self.selection.select_month(month);
    }

    pub fn select_year(&mut self, year: i32) {
        self.selection.select_year(year);
    }

    fn page_count(&self) -> usize {
        let filtered = match self.selection.selected_year {
            Some(year) => ledger::view::filtered_records(
                self.ledger.records(),
                &self.selection.selected_month,
                year,
            )
            .len(),
            None => 0,
        };
        total_pages(filtered, self.config.page_size())
    }

    pub fn next_page(&mut self) {
        let pages = self.page_count();
        self.selection.next_page(pages);
    }

    pub fn previous_page(&mut self) {
        self.selection.previous_page();
    }

    pub fn go_to_page(&mut self, page: usize) {
        let pages = self.page_count();
        self.selection.go_to_page(page, pages);
    }

    /// The month screen for the current selection. Corrects the selection first.
    pub fn month_view(&mut self) -> MonthView {
        let income = self
            .identity()
            .map(|identity| identity.monthly_income)
            .unwrap_or(0.0);
        MonthView::compute(
            self.ledger.records(),
            &mut self.selection,
            income,
            self.config.page_size(),
        )
    }

    /// Month-by-month totals of the selected year.
    pub fn annual_summary(&self) -> Option<AnnualSummary> {
        self.selection
            .selected_year
            .map(|year| annual_totals(self.ledger.records(), year))
    }

    pub fn format_currency(&self, value: f64) -> String {
        self.config.format_currency(value)
    }

    /// Every identity known to the Identity API.
    pub async fn admin_identities(&mut self) -> AppResult<Vec<Identity>> {
        let result = self.admin_identities_inner().await;
        self.track(result)
    }

    async fn admin_identities_inner(&mut self) -> AppResult<Vec<Identity>> {
        self.admin()?;
        Ok(self.session.identities().list().await?)
    }

    /// Every record, optionally restricted to one owner.
    pub async fn admin_records(&mut self, owner_id: Option<&str>) -> AppResult<Vec<ExpenseRecord>> {
        let result = self.admin_records_inner(owner_id).await;
        self.track(result)
    }

    async fn admin_records_inner(&mut self, owner_id: Option<&str>) -> AppResult<Vec<ExpenseRecord>> {
        self.admin()?;
        let records = self.ledger.api().list_all().await?;
        Ok(records_for_owner(&records, owner_id)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Create an account on behalf of someone else. Nobody is signed in as it.
    pub async fn admin_create_identity(
        &mut self,
        registration: &Registration,
        role: Role,
    ) -> AppResult<Identity> {
        let result = self.admin_create_identity_inner(registration, role).await;
        self.track(result)
    }

    async fn admin_create_identity_inner(
        &mut self,
        registration: &Registration,
        role: Role,
    ) -> AppResult<Identity> {
        let admin = self.admin()?;
        let profile = registration.validate()?.with_role(role);
        let identity = self.session.identities().create(&profile).await?;
        info!(admin = %admin.id, user_id = %identity.id, "Identity created");
        Ok(identity)
    }

    pub async fn admin_update_identity(
        &mut self,
        id: &str,
        changes: &IdentityChanges,
    ) -> AppResult<Identity> {
        let result = self.admin_update_identity_inner(id, changes).await;
        self.track(result)
    }

    async fn admin_update_identity_inner(
        &mut self,
        id: &str,
        changes: &IdentityChanges,
    ) -> AppResult<Identity> {
        let admin = self.admin()?;
        let current = self
            .session
            .identities()
            .list()
            .await?
            .into_iter()
            .find(|identity| identity.id == id)
            .ok_or_else(|| AppError::UnknownIdentity(id.to_string()))?;
        let identity = changes.apply(current)?;
        let saved = self
            .session
            .identities()
            .update(&identity, changes.password.as_deref())
            .await?;
        info!(admin = %admin.id, user_id = %id, "Identity updated");
        Ok(saved)
    }

    /// Delete an identity and then every record it owns.
    pub async fn admin_delete_identity(&mut self, id: &str) -> AppResult<()> {
        let result = self.admin_delete_identity_inner(id).await;
        self.track(result)
    }

    async fn admin_delete_identity_inner(&mut self, id: &str) -> AppResult<()> {
        let admin = self.admin()?;
        self.session.identities().delete(id).await?;
        let records = self.ledger.api().list(id).await?;
        for record in &records {
            self.ledger.api().delete(&record.id).await?;
        }
        info!(admin = %admin.id, user_id = %id, records = records.len(), "Identity deleted");
        Ok(())
    }

    /// Create a record for `owner_id`. A blank date files it under the
    /// selected month.
    pub async fn admin_add_expense(
        &mut self,
        owner_id: &str,
        form: &ExpenseForm,
    ) -> AppResult<ExpenseRecord> {
        let result = self.admin_add_expense_inner(owner_id, form).await;
        self.track(result)
    }

    async fn admin_add_expense_inner(
        &mut self,
        owner_id: &str,
        form: &ExpenseForm,
    ) -> AppResult<ExpenseRecord> {
        let admin = self.admin()?;
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(ValidationError::Missing("Owner").into());
        }
        let input = form.parse()?;
        let month = resolve_month_for_mutation(&input.date, &self.selection.selected_month)?;
        let record = self.ledger.api().create(&input.draft(month, owner_id)).await?;
        info!(admin = %admin.id, id = %record.id, owner = %owner_id, "Record created");
        Ok(record)
    }

    /// Replace the fields of any owner's record `id` with `form`.
    pub async fn admin_save_expense(
        &mut self,
        id: &str,
        form: &ExpenseForm,
    ) -> AppResult<ExpenseRecord> {
        let result = self.admin_save_expense_inner(id, form).await;
        self.track(result)
    }

    async fn admin_save_expense_inner(
        &mut self,
        id: &str,
        form: &ExpenseForm,
    ) -> AppResult<ExpenseRecord> {
        let admin = self.admin()?;
        let input = form.parse()?;
        let mut record = self
            .ledger
            .api()
            .list_all()
            .await?
            .into_iter()
            .find(|record| record.id == id)
            .ok_or_else(|| LedgerError::UnknownRecord(id.to_string()))?;
        record.description = input.description;
        record.category = input.category;
        record.amount = input.amount;
        record.date = input.date;
        record.month = resolve_month_for_mutation(&record.date, &record.month)?;
        let mut saved = self.ledger.api().update(&record).await?;
        saved.id = record.id;
        info!(admin = %admin.id, id = %saved.id, "Record updated");
        Ok(saved)
    }

    pub async fn admin_delete_expense(&mut self, id: &str) -> AppResult<()> {
        let result = self.admin_delete_expense_inner(id).await;
        self.track(result)
    }

    async fn admin_delete_expense_inner(&mut self, id: &str) -> AppResult<()> {
        let admin = self.admin()?;
        self.ledger.api().delete(id).await?;
        info!(admin = %admin.id, id = %id, "Record deleted");
        Ok(())
    }
}
