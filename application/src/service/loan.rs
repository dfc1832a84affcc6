use std::str::FromStr;

use error_stack::Report;
use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use kernel::interface::notify::DependOnLoanNotifier;
use kernel::interface::query::{
    BookQuery, DependOnBookQuery, DependOnLoanQuery, DependOnUserQuery, LoanQuery, UserQuery,
};
use kernel::interface::update::{
    DependOnInventoryLedger, DependOnLoanModifier, InventoryLedger, LoanModifier,
};
use kernel::prelude::entity::{
    loan_period, Book, BookId, DependOnLoanPolicy, DueDate, InventoryEffect, LibraryId, Loan,
    LoanId, LoanStatus, NotificationKind, Restock, Tenant, User, UserId,
};
use kernel::KernelError;
use time::{Duration, OffsetDateTime};

use crate::service::notify_quietly;
use crate::transfer::{
    parse_due_date, CreateLoanDto, ExtendLoanDto, GetAllLoanDto, GetLoanDto, GetLoansFromBookDto,
    GetLoansFromUserDto, LoanByNamesDto, LoanDto, RenewLoanDto, RequestLoanDto,
    TransitionLoanDto,
};

type Connection<M> =
    <<M as DependOnDatabaseConnection>::DatabaseConnection as DatabaseConnection>::Transaction;

fn loan_not_found(id: &LoanId) -> Report<KernelError> {
    Report::new(KernelError::NotFound).attach_printable(format!("loan {} not found", id.as_ref()))
}

fn into_dtos(loans: Vec<Loan>) -> error_stack::Result<Vec<LoanDto>, KernelError> {
    loans.into_iter().map(LoanDto::try_from).collect()
}

/// Narrows fuzzy lookup results to one record. An exact match wins over
/// partial ones.
pub(crate) fn pick_single<T>(
    what: &str,
    query: &str,
    mut candidates: Vec<T>,
    is_exact: impl Fn(&T) -> bool,
) -> error_stack::Result<T, KernelError> {
    if let Some(position) = candidates.iter().position(&is_exact) {
        if candidates.iter().filter(|&c| is_exact(c)).count() == 1 {
            return Ok(candidates.swap_remove(position));
        }
    }
    match candidates.len() {
        0 => Err(Report::new(KernelError::NotFound)
            .attach_printable(format!("no {what} matches \"{query}\""))),
        1 => Ok(candidates.remove(0)),
        n => Err(Report::new(KernelError::AmbiguousMatch)
            .attach_printable(format!("{n} {what}s match \"{query}\""))),
    }
}

async fn resolve_user<M>(
    module: &M,
    connection: &mut Connection<M>,
    library_id: &LibraryId,
    name: &str,
) -> error_stack::Result<User, KernelError>
where
    M: DependOnUserQuery + ?Sized,
{
    let users = module
        .user_query()
        .find_by_name(connection, library_id, name.trim())
        .await?;
    pick_single("user", name, users, |user| user.name().is_exactly(name))
}

async fn resolve_book<M>(
    module: &M,
    connection: &mut Connection<M>,
    library_id: &LibraryId,
    title: &str,
) -> error_stack::Result<Book, KernelError>
where
    M: DependOnBookQuery + ?Sized,
{
    let books = module
        .book_query()
        .find_by_title(connection, library_id, title.trim())
        .await?;
    pick_single("book", title, books, |book| book.title().is_exactly(title))
}

/// Checks every precondition of a new loan, then takes a copy (for `active`
/// loans) and inserts the row. Nothing is written unless all checks pass.
#[allow(clippy::too_many_arguments)]
async fn open_loan<M>(
    module: &M,
    connection: &mut Connection<M>,
    tenant: &Tenant,
    book_id: &BookId,
    user_id: &UserId,
    status: LoanStatus,
    duration: Duration,
    now: OffsetDateTime,
) -> error_stack::Result<Loan, KernelError>
where
    M: DependOnBookQuery
        + DependOnUserQuery
        + DependOnLoanQuery
        + DependOnLoanModifier
        + DependOnInventoryLedger
        + DependOnLoanPolicy
        + ?Sized,
{
    let library_id = tenant.library_id();
    // Lock order is user then book. The user lock serializes the
    // outstanding-loan count below.
    let user = module
        .user_query()
        .lock_by_id(connection, library_id, user_id)
        .await?;
    let book = module
        .book_query()
        .lock_by_id(connection, library_id, book_id)
        .await?
        .ok_or_else(|| {
            Report::new(KernelError::NotFound)
                .attach_printable(format!("book {} not found", book_id.as_ref()))
        })?;
    user.ok_or_else(|| {
        Report::new(KernelError::NotFound)
            .attach_printable(format!("user {} not found", user_id.as_ref()))
    })?;
    tenant.require_self_or_admin(user_id)?;

    let limit = *module.loan_policy().max_outstanding();
    let outstanding = module
        .loan_query()
        .count_by_user_id(
            connection,
            library_id,
            user_id,
            &[LoanStatus::Pending, LoanStatus::Active],
        )
        .await?;
    if outstanding >= limit {
        return Err(Report::new(KernelError::LimitExceeded)
            .attach_printable(format!("user already holds {outstanding} of {limit} loans")));
    }

    if !book.inventory().is_available() {
        return Err(Report::new(KernelError::Unavailable).attach_printable(format!(
            "all {} copies of \"{}\" are on loan",
            book.inventory().stock(),
            book.title().as_ref()
        )));
    }
    let loan = Loan::open(
        library_id.clone(),
        book_id.clone(),
        user_id.clone(),
        status,
        now,
        duration,
    )?;

    if status == LoanStatus::Active {
        module
            .inventory_ledger()
            .decrement(connection, library_id, book_id)
            .await?;
    }
    module.loan_modifier().create(connection, &loan).await?;
    Ok(loan)
}

/// Applies a caller-requested status change together with its inventory
/// effect. Returns the updated loan and the notification it calls for.
async fn apply_transition<M>(
    module: &M,
    connection: &mut Connection<M>,
    loan: Loan,
    to: LoanStatus,
    now: OffsetDateTime,
) -> error_stack::Result<(Loan, Option<NotificationKind>), KernelError>
where
    M: DependOnLoanModifier + DependOnInventoryLedger + DependOnLoanPolicy + ?Sized,
{
    let expected = *loan.status();
    let (loan, transition) = loan.transit(to, now)?;

    match transition.inventory() {
        InventoryEffect::Decrement => {
            module
                .inventory_ledger()
                .decrement(connection, loan.library_id(), loan.book_id())
                .await?
        }
        InventoryEffect::Increment => {
            let restock = module
                .inventory_ledger()
                .increment(
                    connection,
                    loan.library_id(),
                    loan.book_id(),
                    module.loan_policy().overflow(),
                )
                .await?;
            if restock == Restock::Clamped {
                tracing::warn!(
                    loan_id = %loan.id().as_ref(),
                    book_id = %loan.book_id().as_ref(),
                    "return would exceed stock, available left unchanged"
                );
            }
        }
        InventoryEffect::Unchanged => {}
    }

    module
        .loan_modifier()
        .update(connection, &loan, &expected)
        .await?;
    Ok((loan, transition.notification()))
}

fn loan_duration(days: Option<i64>, default: &Duration) -> error_stack::Result<Duration, KernelError> {
    days.map_or(Ok(*default), loan_period)
}

#[async_trait::async_trait]
pub trait GetLoanService:
    'static + Sync + Send + DependOnDatabaseConnection + DependOnLoanQuery
{
    async fn get_loan(
        &self,
        tenant: &Tenant,
        dto: GetLoanDto,
    ) -> error_stack::Result<Option<LoanDto>, KernelError> {
        let mut connection = self.database_connection().transact().await?;
        let loan = self
            .loan_query()
            .find_by_id(&mut connection, tenant.library_id(), &LoanId::new(dto.id))
            .await?;
        match loan {
            Some(loan) => {
                tenant.require_self_or_admin(loan.user_id())?;
                Ok(Some(LoanDto::try_from(loan)?))
            }
            None => Ok(None),
        }
    }

    async fn get_loans(
        &self,
        tenant: &Tenant,
        dto: GetAllLoanDto,
    ) -> error_stack::Result<Vec<LoanDto>, KernelError> {
        tenant.require_admin()?;
        let mut connection = self.database_connection().transact().await?;
        let loans = self
            .loan_query()
            .find_all(&mut connection, tenant.library_id(), &dto.limit, &dto.offset)
            .await?;
        into_dtos(loans)
    }

    async fn get_loans_from_user(
        &self,
        tenant: &Tenant,
        dto: GetLoansFromUserDto,
    ) -> error_stack::Result<Vec<LoanDto>, KernelError> {
        let user_id = UserId::new(dto.user_id);
        tenant.require_self_or_admin(&user_id)?;
        let mut connection = self.database_connection().transact().await?;
        let loans = self
            .loan_query()
            .find_by_user_id(&mut connection, tenant.library_id(), &user_id)
            .await?;
        into_dtos(loans)
    }

    async fn get_loans_from_book(
        &self,
        tenant: &Tenant,
        dto: GetLoansFromBookDto,
    ) -> error_stack::Result<Vec<LoanDto>, KernelError> {
        tenant.require_admin()?;
        let mut connection = self.database_connection().transact().await?;
        let loans = self
            .loan_query()
            .find_by_book_id(&mut connection, tenant.library_id(), &BookId::new(dto.book_id))
            .await?;
        into_dtos(loans)
    }
}

impl<T> GetLoanService for T where T: DependOnDatabaseConnection + DependOnLoanQuery {}

#[async_trait::async_trait]
pub trait CreateLoanService:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection
    + DependOnBookQuery
    + DependOnUserQuery
    + DependOnLoanQuery
    + DependOnLoanModifier
    + DependOnInventoryLedger
    + DependOnLoanNotifier
    + DependOnLoanPolicy
{
    /// Lends a copy right away. Staff may lend to anyone in the library,
    /// students only to themselves.
    async fn create_loan(
        &self,
        tenant: &Tenant,
        dto: CreateLoanDto,
    ) -> error_stack::Result<LoanDto, KernelError> {
        let duration = loan_duration(dto.duration_days, self.loan_policy().loan_duration())?;
        let mut connection = self.database_connection().transact().await?;

        let loan = open_loan(
            self,
            &mut connection,
            tenant,
            &BookId::new(dto.book_id),
            &UserId::new(dto.user_id),
            LoanStatus::Active,
            duration,
            OffsetDateTime::now_utc(),
        )
        .await?;
        connection.commit().await?;

        tracing::info!(loan_id = %loan.id().as_ref(), "loan created");
        notify_quietly(self.loan_notifier(), loan.id(), NotificationKind::NewLoan).await;
        LoanDto::try_from(loan)
    }

    /// Chat-tool variant of [`CreateLoanService::create_loan`] addressing the
    /// borrower and the book by name.
    async fn borrow_by_names(
        &self,
        tenant: &Tenant,
        dto: LoanByNamesDto,
    ) -> error_stack::Result<LoanDto, KernelError> {
        let mut connection = self.database_connection().transact().await?;
        let user = resolve_user(self, &mut connection, tenant.library_id(), &dto.user_name).await?;
        let book =
            resolve_book(self, &mut connection, tenant.library_id(), &dto.book_title).await?;

        let loan = open_loan(
            self,
            &mut connection,
            tenant,
            book.id(),
            user.id(),
            LoanStatus::Active,
            *self.loan_policy().chat_loan_duration(),
            OffsetDateTime::now_utc(),
        )
        .await?;
        connection.commit().await?;

        tracing::info!(loan_id = %loan.id().as_ref(), "loan created by names");
        notify_quietly(self.loan_notifier(), loan.id(), NotificationKind::NewLoan).await;
        LoanDto::try_from(loan)
    }
}

impl<T> CreateLoanService for T where
    T: DependOnDatabaseConnection
        + DependOnBookQuery
        + DependOnUserQuery
        + DependOnLoanQuery
        + DependOnLoanModifier
        + DependOnInventoryLedger
        + DependOnLoanNotifier
        + DependOnLoanPolicy
{
}

#[async_trait::async_trait]
pub trait RequestLoanService:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection
    + DependOnBookQuery
    + DependOnUserQuery
    + DependOnLoanQuery
    + DependOnLoanModifier
    + DependOnInventoryLedger
    + DependOnLoanPolicy
{
    /// Files a `pending` loan for the caller. The copy is taken on approval.
    async fn request_loan(
        &self,
        tenant: &Tenant,
        dto: RequestLoanDto,
    ) -> error_stack::Result<LoanDto, KernelError> {
        let mut connection = self.database_connection().transact().await?;
        let loan = open_loan(
            self,
            &mut connection,
            tenant,
            &BookId::new(dto.book_id),
            tenant.user_id(),
            LoanStatus::Pending,
            *self.loan_policy().loan_duration(),
            OffsetDateTime::now_utc(),
        )
        .await?;
        connection.commit().await?;

        tracing::info!(loan_id = %loan.id().as_ref(), "loan requested");
        LoanDto::try_from(loan)
    }
}

impl<T> RequestLoanService for T where
    T: DependOnDatabaseConnection
        + DependOnBookQuery
        + DependOnUserQuery
        + DependOnLoanQuery
        + DependOnLoanModifier
        + DependOnInventoryLedger
        + DependOnLoanPolicy
{
}

#[async_trait::async_trait]
pub trait TransitionLoanService:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection
    + DependOnBookQuery
    + DependOnUserQuery
    + DependOnLoanQuery
    + DependOnLoanModifier
    + DependOnInventoryLedger
    + DependOnLoanNotifier
    + DependOnLoanPolicy
{
    /// Approve, reject or return a loan.
    async fn transition_loan(
        &self,
        tenant: &Tenant,
        dto: TransitionLoanDto,
    ) -> error_stack::Result<LoanDto, KernelError> {
        tenant.require_admin()?;
        let to = LoanStatus::from_str(&dto.status)?;
        let id = LoanId::new(dto.id);

        let mut connection = self.database_connection().transact().await?;
        let loan = self
            .loan_query()
            .find_by_id(&mut connection, tenant.library_id(), &id)
            .await?
            .ok_or_else(|| loan_not_found(&id))?;
        let from = *loan.status();
        let (loan, notification) =
            apply_transition(self, &mut connection, loan, to, OffsetDateTime::now_utc()).await?;
        connection.commit().await?;

        tracing::info!(loan_id = %dto.id, %from, %to, "loan status changed");
        if let Some(kind) = notification {
            notify_quietly(self.loan_notifier(), loan.id(), kind).await;
        }
        LoanDto::try_from(loan)
    }

    /// Chat-tool return addressing the borrower and the book by name.
    async fn return_by_names(
        &self,
        tenant: &Tenant,
        dto: LoanByNamesDto,
    ) -> error_stack::Result<LoanDto, KernelError> {
        let mut connection = self.database_connection().transact().await?;
        let user = resolve_user(self, &mut connection, tenant.library_id(), &dto.user_name).await?;
        tenant.require_self_or_admin(user.id())?;
        let book =
            resolve_book(self, &mut connection, tenant.library_id(), &dto.book_title).await?;

        let loan = self
            .loan_query()
            .find_by_user_and_book(
                &mut connection,
                tenant.library_id(),
                user.id(),
                book.id(),
                &[LoanStatus::Active, LoanStatus::Overdue],
            )
            .await?
            .into_iter()
            .min_by_key(|loan| *loan.due_date().as_ref())
            .ok_or_else(|| {
                Report::new(KernelError::NotFound).attach_printable(format!(
                    "{} has no open loan of \"{}\"",
                    user.name().as_ref(),
                    book.title().as_ref()
                ))
            })?;
        let (loan, notification) = apply_transition(
            self,
            &mut connection,
            loan,
            LoanStatus::Returned,
            OffsetDateTime::now_utc(),
        )
        .await?;
        connection.commit().await?;

        tracing::info!(loan_id = %loan.id().as_ref(), "loan returned by names");
        if let Some(kind) = notification {
            notify_quietly(self.loan_notifier(), loan.id(), kind).await;
        }
        LoanDto::try_from(loan)
    }
}

impl<T> TransitionLoanService for T where
    T: DependOnDatabaseConnection
        + DependOnBookQuery
        + DependOnUserQuery
        + DependOnLoanQuery
        + DependOnLoanModifier
        + DependOnInventoryLedger
        + DependOnLoanNotifier
        + DependOnLoanPolicy
{
}

#[async_trait::async_trait]
pub trait ExtendLoanService:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection
    + DependOnBookQuery
    + DependOnUserQuery
    + DependOnLoanQuery
    + DependOnLoanModifier
    + DependOnLoanPolicy
{
    async fn extend_loan(
        &self,
        tenant: &Tenant,
        dto: ExtendLoanDto,
    ) -> error_stack::Result<LoanDto, KernelError> {
        tenant.require_admin()?;
        let due_date = parse_due_date(dto.due_date.as_deref())?;
        let id = LoanId::new(dto.id);

        let mut connection = self.database_connection().transact().await?;
        let loan = self
            .loan_query()
            .find_by_id(&mut connection, tenant.library_id(), &id)
            .await?
            .ok_or_else(|| loan_not_found(&id))?;
        let loan = extend(self, &mut connection, loan, due_date).await?;
        connection.commit().await?;

        LoanDto::try_from(loan)
    }

    /// Chat-tool renewal. Without an explicit date the current due date is
    /// pushed back by the configured renewal period.
    async fn renew_loan(
        &self,
        tenant: &Tenant,
        dto: RenewLoanDto,
    ) -> error_stack::Result<LoanDto, KernelError> {
        let explicit = dto
            .new_due_date
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_due_date(Some(raw)))
            .transpose()?;

        let mut connection = self.database_connection().transact().await?;
        let user = resolve_user(self, &mut connection, tenant.library_id(), &dto.user_name).await?;
        tenant.require_self_or_admin(user.id())?;
        let book =
            resolve_book(self, &mut connection, tenant.library_id(), &dto.book_title).await?;

        let loan = self
            .loan_query()
            .find_by_user_and_book(
                &mut connection,
                tenant.library_id(),
                user.id(),
                book.id(),
                &[LoanStatus::Active],
            )
            .await?
            .into_iter()
            .min_by_key(|loan| *loan.due_date().as_ref())
            .ok_or_else(|| {
                Report::new(KernelError::NotFound).attach_printable(format!(
                    "{} has no active loan of \"{}\"",
                    user.name().as_ref(),
                    book.title().as_ref()
                ))
            })?;
        let due_date = match explicit {
            Some(due_date) => due_date,
            None => loan.due_date().extended_by(*self.loan_policy().renew_extension())?,
        };
        let loan = extend(self, &mut connection, loan, due_date).await?;
        connection.commit().await?;

        LoanDto::try_from(loan)
    }
}

impl<T> ExtendLoanService for T where
    T: DependOnDatabaseConnection
        + DependOnBookQuery
        + DependOnUserQuery
        + DependOnLoanQuery
        + DependOnLoanModifier
        + DependOnLoanPolicy
{
}

async fn extend<M>(
    module: &M,
    connection: &mut Connection<M>,
    loan: Loan,
    due_date: DueDate,
) -> error_stack::Result<Loan, KernelError>
where
    M: DependOnLoanModifier + ?Sized,
{
    let expected = *loan.status();
    let loan = loan.extend(due_date, OffsetDateTime::now_utc())?;
    module
        .loan_modifier()
        .update(connection, &loan, &expected)
        .await?;
    tracing::info!(
        loan_id = %loan.id().as_ref(),
        status = %loan.status(),
        "due date extended"
    );
    Ok(loan)
}

#[cfg(test)]
mod test {
    use time::macros::datetime;
    use time::Duration;

    use crate::mock::*;
    use crate::service::loan::pick_single;
    use crate::service::{
        CreateLoanService, ExtendLoanService, GetLoanService, RequestLoanService,
        TransitionLoanService,
    };
    use crate::transfer::{
        CreateLoanDto, ExtendLoanDto, GetLoanDto, GetLoansFromUserDto, LoanByNamesDto,
        RenewLoanDto, RequestLoanDto, TransitionLoanDto,
    };
    use kernel::prelude::entity::{LoanStatus, NotificationKind, OverflowPolicy, Tenant};
    use kernel::KernelError;
    use uuid::Uuid;

    fn lend(user: &Tenant, book: Uuid) -> CreateLoanDto {
        CreateLoanDto {
            book_id: book,
            user_id: *user.user_id().as_ref(),
            duration_days: None,
        }
    }

    fn transit(id: Uuid, status: &str) -> TransitionLoanDto {
        TransitionLoanDto {
            id,
            status: status.into(),
        }
    }

    #[test]
    fn exact_match_beats_partial_matches() {
        let names = vec!["Ann".to_string(), "Anna".to_string(), "Joanne".to_string()];
        let picked = pick_single("user", "ann", names, |n| n.eq_ignore_ascii_case("ann")).unwrap();
        assert_eq!(picked, "Ann");
    }

    #[test]
    fn partial_matches_must_be_unique() {
        let names = vec!["Anna".to_string(), "Joanne".to_string()];
        let err = pick_single("user", "ann", names, |_| false).unwrap_err();
        assert_eq!(err.current_context(), &KernelError::AmbiguousMatch);

        let err = pick_single("user", "bob", Vec::<String>::new(), |_| false).unwrap_err();
        assert_eq!(err.current_context(), &KernelError::NotFound);

        let single = pick_single("user", "ann", vec!["Joanne".to_string()], |_| false).unwrap();
        assert_eq!(single, "Joanne");
    }

    #[tokio::test]
    async fn loan_takes_a_copy_and_notifies() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 2);

        let loan = module.create_loan(&admin, lend(&alice, book)).await.unwrap();
        assert_eq!(loan.status, "active");
        assert_eq!(module.inventory_of(book), (2, 1));
        assert_eq!(
            module.notifications(),
            vec![(loan.id, NotificationKind::NewLoan)]
        );
    }

    #[tokio::test]
    async fn default_due_date_is_a_week_out() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);

        let loan = module.create_loan(&admin, lend(&alice, book)).await.unwrap();
        let stored = module.loan(loan.id);
        assert_eq!(
            *stored.due_date().as_ref() - *stored.borrowed_at().as_ref(),
            Duration::days(7)
        );
    }

    #[tokio::test]
    async fn non_positive_duration_is_rejected() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);
        let err = module
            .create_loan(
                &admin,
                CreateLoanDto {
                    duration_days: Some(0),
                    ..lend(&alice, book)
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::InvalidInput);
        assert_eq!(module.inventory_of(book), (1, 1));
    }

    #[tokio::test]
    async fn oversized_duration_is_rejected_before_touching_inventory() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);
        let err = module
            .create_loan(
                &admin,
                CreateLoanDto {
                    duration_days: Some(5_000_000),
                    ..lend(&alice, book)
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::InvalidInput);
        assert_eq!(module.inventory_of(book), (1, 1));
        assert!(module.loans().is_empty());
    }

    #[tokio::test]
    async fn fourth_outstanding_loan_exceeds_limit() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        for title in ["A", "B", "C"] {
            let book = module.book(&admin, title, 1);
            module.create_loan(&admin, lend(&alice, book)).await.unwrap();
        }
        let plenty = module.book(&admin, "D", 10);
        let err = module
            .create_loan(&admin, lend(&alice, plenty))
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::LimitExceeded);
        assert_eq!(module.inventory_of(plenty), (10, 10));

        let empty = module.book(&admin, "E", 0);
        let err = module
            .create_loan(&admin, lend(&alice, empty))
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::LimitExceeded);
    }

    #[tokio::test]
    async fn new_loan_locks_borrower_before_book() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);

        module.create_loan(&admin, lend(&alice, book)).await.unwrap();
        assert_eq!(module.locked_rows(), vec![*alice.user_id().as_ref(), book]);
    }

    #[tokio::test]
    async fn pending_requests_count_toward_limit() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        for title in ["A", "B", "C"] {
            let book = module.book(&admin, title, 1);
            module
                .request_loan(&alice, RequestLoanDto { book_id: book })
                .await
                .unwrap();
        }
        let book = module.book(&admin, "D", 1);
        let err = module
            .create_loan(&alice, lend(&alice, book))
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::LimitExceeded);
    }

    #[tokio::test]
    async fn borrow_then_return_restores_availability() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 5);

        let loan = module.create_loan(&admin, lend(&alice, book)).await.unwrap();
        assert_eq!(module.inventory_of(book), (5, 4));
        let returned = module
            .transition_loan(&admin, transit(loan.id, "returned"))
            .await
            .unwrap();
        assert_eq!(returned.status, "returned");
        assert!(returned.returned_at.is_some());
        assert_eq!(module.inventory_of(book), (5, 5));
    }

    #[tokio::test]
    async fn unavailable_book_is_left_untouched() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 0);

        let err = module
            .create_loan(&admin, lend(&alice, book))
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::Unavailable);
        assert_eq!(module.inventory_of(book), (0, 0));
        assert!(module.loans().is_empty());
    }

    #[tokio::test]
    async fn two_copies_three_borrowers() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let book = module.book(&admin, "Dune", 2);
        let u1 = module.student(&library, "U1");
        let u2 = module.student(&library, "U2");
        let u3 = module.student(&library, "U3");

        module.create_loan(&admin, lend(&u1, book)).await.unwrap();
        module.create_loan(&admin, lend(&u2, book)).await.unwrap();
        assert_eq!(module.inventory_of(book), (2, 0));

        let err = module.create_loan(&admin, lend(&u3, book)).await.unwrap_err();
        assert_eq!(err.current_context(), &KernelError::Unavailable);
        assert_eq!(module.loans().len(), 2);
    }

    #[tokio::test]
    async fn approval_without_copies_keeps_request_pending() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let bob = module.student(&library, "Bob");
        let book = module.book(&admin, "Dune", 1);

        let request = module
            .request_loan(&alice, RequestLoanDto { book_id: book })
            .await
            .unwrap();
        assert_eq!(request.status, "pending");
        assert_eq!(module.inventory_of(book), (1, 1));
        module.create_loan(&admin, lend(&bob, book)).await.unwrap();

        let err = module
            .transition_loan(&admin, transit(request.id, "active"))
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::Unavailable);
        assert_eq!(module.loan(request.id).status(), &LoanStatus::Pending);
        assert_eq!(module.inventory_of(book), (1, 0));
    }

    #[tokio::test]
    async fn approval_takes_a_copy_and_rejection_does_not() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 3);

        let first = module
            .request_loan(&alice, RequestLoanDto { book_id: book })
            .await
            .unwrap();
        let second = module
            .request_loan(&alice, RequestLoanDto { book_id: book })
            .await
            .unwrap();
        module
            .transition_loan(&admin, transit(first.id, "active"))
            .await
            .unwrap();
        module
            .transition_loan(&admin, transit(second.id, "rejected"))
            .await
            .unwrap();

        assert_eq!(module.inventory_of(book), (3, 2));
        assert_eq!(
            module.notifications(),
            vec![
                (first.id, NotificationKind::NewLoan),
                (second.id, NotificationKind::RejectedLoan)
            ]
        );
    }

    #[tokio::test]
    async fn returned_loan_cannot_be_reopened() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);
        let loan = module.create_loan(&admin, lend(&alice, book)).await.unwrap();
        module
            .transition_loan(&admin, transit(loan.id, "returned"))
            .await
            .unwrap();

        for status in ["active", "returned", "overdue", "pending"] {
            let err = module
                .transition_loan(&admin, transit(loan.id, status))
                .await
                .unwrap_err();
            assert_eq!(err.current_context(), &KernelError::InvalidTransition);
        }
        assert_eq!(module.inventory_of(book), (1, 1));
    }

    #[tokio::test]
    async fn unknown_status_is_invalid_input() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);
        let loan = module.create_loan(&admin, lend(&alice, book)).await.unwrap();
        let err = module
            .transition_loan(&admin, transit(loan.id, "lost"))
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::InvalidInput);
    }

    #[tokio::test]
    async fn students_cannot_approve() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);
        let request = module
            .request_loan(&alice, RequestLoanDto { book_id: book })
            .await
            .unwrap();
        let err = module
            .transition_loan(&alice, transit(request.id, "active"))
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::PermissionDenied);
    }

    #[tokio::test]
    async fn students_borrow_only_for_themselves() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let bob = module.student(&library, "Bob");
        let book = module.book(&admin, "Dune", 2);

        assert!(module.create_loan(&alice, lend(&alice, book)).await.is_ok());
        let err = module
            .create_loan(&alice, lend(&bob, book))
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::PermissionDenied);
        assert_eq!(module.inventory_of(book), (2, 1));
    }

    #[tokio::test]
    async fn other_library_is_invisible() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let (intruder, _) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);
        let loan = module.create_loan(&admin, lend(&alice, book)).await.unwrap();

        let err = module
            .transition_loan(&intruder, transit(loan.id, "returned"))
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::NotFound);
        let err = module
            .create_loan(&intruder, lend(&alice, book))
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::NotFound);
        assert!(module
            .get_loan(&intruder, GetLoanDto { id: loan.id })
            .await
            .unwrap()
            .is_none());
        assert_eq!(module.inventory_of(book), (1, 0));
    }

    #[tokio::test]
    async fn failed_notification_does_not_fail_the_loan() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);
        module.fail_notifications();

        let loan = module.create_loan(&admin, lend(&alice, book)).await.unwrap();
        assert_eq!(module.loan(loan.id).status(), &LoanStatus::Active);
        assert_eq!(module.inventory_of(book), (1, 0));
    }

    #[tokio::test]
    async fn return_clamps_when_stock_was_lowered() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);
        let loan = module.create_loan(&admin, lend(&alice, book)).await.unwrap();
        module.force_inventory(book, 1, 1);

        module
            .transition_loan(&admin, transit(loan.id, "returned"))
            .await
            .unwrap();
        assert_eq!(module.inventory_of(book), (1, 1));
    }

    #[tokio::test]
    async fn return_overflow_can_be_rejected() {
        let module = MockModule::with_overflow(OverflowPolicy::Reject);
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);
        let loan = module.create_loan(&admin, lend(&alice, book)).await.unwrap();
        module.force_inventory(book, 1, 1);

        let err = module
            .transition_loan(&admin, transit(loan.id, "returned"))
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::InventoryOverflow);
        assert_eq!(module.loan(loan.id).status(), &LoanStatus::Active);
    }

    #[tokio::test]
    async fn extending_overdue_loan_reactivates_it() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);
        let id = module.overdue_loan(&alice, book, datetime!(2024-01-01 00:00 UTC));

        let extended = module
            .extend_loan(
                &admin,
                ExtendLoanDto {
                    id,
                    due_date: Some("2030-01-01".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(extended.status, "active");
        assert_eq!(
            module.loan(id).due_date().as_ref(),
            &datetime!(2030-01-01 00:00 UTC)
        );
    }

    #[tokio::test]
    async fn extension_needs_a_new_parseable_date() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);
        let id = module.overdue_loan(&alice, book, datetime!(2024-01-01 00:00 UTC));

        for due_date in [None, Some("soon".to_string()), Some("2024-01-01".to_string())] {
            let err = module
                .extend_loan(&admin, ExtendLoanDto { id, due_date })
                .await
                .unwrap_err();
            assert_eq!(err.current_context(), &KernelError::InvalidInput);
        }
        assert_eq!(module.loan(id).status(), &LoanStatus::Overdue);
    }

    #[tokio::test]
    async fn chat_borrow_resolves_names_and_lends_two_weeks() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        module.student(&library, "Alice Liddell");
        let book = module.book(&admin, "The Hobbit", 1);

        let loan = module
            .borrow_by_names(
                &admin,
                LoanByNamesDto {
                    user_name: "alice".into(),
                    book_title: "hobbit".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(loan.book_id, book);
        let stored = module.loan(loan.id);
        assert_eq!(
            *stored.due_date().as_ref() - *stored.borrowed_at().as_ref(),
            Duration::days(14)
        );
    }

    #[tokio::test]
    async fn chat_borrow_refuses_ambiguous_names() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        module.student(&library, "Anna");
        module.student(&library, "Joanna");
        let book = module.book(&admin, "Dune", 1);

        let err = module
            .borrow_by_names(
                &admin,
                LoanByNamesDto {
                    user_name: "ann".into(),
                    book_title: "Dune".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::AmbiguousMatch);
        assert_eq!(module.inventory_of(book), (1, 1));
    }

    #[tokio::test]
    async fn chat_return_accepts_overdue_loans() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);
        let id = module.overdue_loan(&alice, book, datetime!(2024-01-01 00:00 UTC));

        let returned = module
            .return_by_names(
                &admin,
                LoanByNamesDto {
                    user_name: "Alice".into(),
                    book_title: "dune".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(returned.id, id);
        assert_eq!(returned.status, "returned");
        assert_eq!(module.inventory_of(book), (1, 1));
    }

    #[tokio::test]
    async fn chat_renew_pushes_due_date_by_two_weeks() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);
        let loan = module.create_loan(&admin, lend(&alice, book)).await.unwrap();
        let before = *module.loan(loan.id).due_date().as_ref();

        module
            .renew_loan(
                &admin,
                RenewLoanDto {
                    user_name: "alice".into(),
                    book_title: "Dune".into(),
                    new_due_date: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            *module.loan(loan.id).due_date().as_ref(),
            before + Duration::days(14)
        );
    }

    #[tokio::test]
    async fn chat_renew_past_the_calendar_end_is_invalid_input() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);
        let loan = module.active_loan(&alice, book, datetime!(9999-12-30 00:00 UTC));

        let err = module
            .renew_loan(
                &admin,
                RenewLoanDto {
                    user_name: "Alice".into(),
                    book_title: "Dune".into(),
                    new_due_date: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::InvalidInput);
        assert_eq!(
            *module.loan(loan).due_date().as_ref(),
            datetime!(9999-12-30 00:00 UTC)
        );
    }

    #[tokio::test]
    async fn chat_renew_requires_an_active_loan() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);
        module.overdue_loan(&alice, book, datetime!(2024-01-01 00:00 UTC));

        let err = module
            .renew_loan(
                &admin,
                RenewLoanDto {
                    user_name: "Alice".into(),
                    book_title: "Dune".into(),
                    new_due_date: Some("2030-01-01".into()),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::NotFound);
    }

    #[tokio::test]
    async fn students_list_only_their_own_loans() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let bob = module.student(&library, "Bob");
        let book = module.book(&admin, "Dune", 2);
        module.create_loan(&admin, lend(&alice, book)).await.unwrap();

        let own = module
            .get_loans_from_user(
                &alice,
                GetLoansFromUserDto {
                    user_id: *alice.user_id().as_ref(),
                },
            )
            .await
            .unwrap();
        assert_eq!(own.len(), 1);
        let err = module
            .get_loans_from_user(
                &bob,
                GetLoansFromUserDto {
                    user_id: *alice.user_id().as_ref(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::PermissionDenied);
    }

    #[tokio::test]
    async fn concurrent_status_change_is_detected() {
        let module = MockModule::default();
        let (admin, library) = module.library_with_admin();
        let alice = module.student(&library, "Alice");
        let book = module.book(&admin, "Dune", 1);
        let loan = module.create_loan(&admin, lend(&alice, book)).await.unwrap();
        let stale = module.loan(loan.id);
        module
            .transition_loan(&admin, transit(loan.id, "returned"))
            .await
            .unwrap();

        let err = module
            .replay_update(stale, LoanStatus::Active)
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::Concurrency);
    }
}
