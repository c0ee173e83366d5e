//! Idempotent mutations
//!
//! Create/associate and delete/disassociate wrapped in a check-then-act so
//! that re-issuing an operation whose desired end state already holds is a
//! success rather than an error. The check is not a lock: concurrent external
//! changes are still possible and are left to the subsequent wait.

use std::future::Future;
use std::sync::Arc;

type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Check-then-act wrapper around mutating calls.
///
/// Optionally re-checks after a failed mutation whose error matches
/// [`recheck_on`](Self::recheck_on) (e.g. "already associated"): the error is
/// turned into success only if the re-check shows the desired end state.
pub struct IdempotentMutator<E> {
    recheck_on: Option<Predicate<E>>,
}

impl<E> Default for IdempotentMutator<E> {
    fn default() -> Self {
        Self { recheck_on: None }
    }
}

impl<E> Clone for IdempotentMutator<E> {
    fn clone(&self) -> Self {
        Self {
            recheck_on: self.recheck_on.clone(),
        }
    }
}

impl<E> IdempotentMutator<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recheck_on(mut self, predicate: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.recheck_on = Some(Arc::new(predicate));
        self
    }

    fn should_recheck(&self, error: &E) -> bool {
        self.recheck_on.as_ref().is_some_and(|p| p(error))
    }

    /// Return the existing object if `check` finds it, otherwise run `create`.
    pub async fn create_or_associate<T, C, CFut, M, MFut>(
        &self,
        mut check: C,
        create: M,
    ) -> Result<T, E>
    where
        C: FnMut() -> CFut,
        CFut: Future<Output = Result<Option<T>, E>>,
        M: FnOnce() -> MFut,
        MFut: Future<Output = Result<T, E>>,
    {
        if let Some(existing) = check().await? {
            tracing::debug!("Desired object already exists, skipping create");
            return Ok(existing);
        }

        match create().await {
            Ok(created) => Ok(created),
            Err(err) if self.should_recheck(&err) => match check().await? {
                Some(existing) => {
                    tracing::info!("Create conflicted but the object now exists, treating as created");
                    Ok(existing)
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    /// Succeed without calling `delete` if `check` finds nothing.
    pub async fn delete_or_disassociate<T, C, CFut, D, DFut>(
        &self,
        mut check: C,
        delete: D,
    ) -> Result<(), E>
    where
        C: FnMut() -> CFut,
        CFut: Future<Output = Result<Option<T>, E>>,
        D: FnOnce() -> DFut,
        DFut: Future<Output = Result<(), E>>,
    {
        if check().await?.is_none() {
            tracing::debug!("Object already absent, skipping delete");
            return Ok(());
        }

        match delete().await {
            Ok(()) => Ok(()),
            Err(err) if self.should_recheck(&err) => match check().await? {
                None => {
                    tracing::info!("Delete failed but the object is gone, treating as deleted");
                    Ok(())
                }
                Some(_) => Err(err),
            },
            Err(err) => Err(err),
        }
    }
}

/// [`IdempotentMutator::create_or_associate`] without conflict re-checks
pub async fn create_or_associate<T, E, C, CFut, M, MFut>(check: C, create: M) -> Result<T, E>
where
    C: FnMut() -> CFut,
    CFut: Future<Output = Result<Option<T>, E>>,
    M: FnOnce() -> MFut,
    MFut: Future<Output = Result<T, E>>,
{
    IdempotentMutator::new()
        .create_or_associate(check, create)
        .await
}

/// [`IdempotentMutator::delete_or_disassociate`] without conflict re-checks
pub async fn delete_or_disassociate<T, E, C, CFut, D, DFut>(check: C, delete: D) -> Result<(), E>
where
    C: FnMut() -> CFut,
    CFut: Future<Output = Result<Option<T>, E>>,
    D: FnOnce() -> DFut,
    DFut: Future<Output = Result<(), E>>,
{
    IdempotentMutator::new()
        .delete_or_disassociate(check, delete)
        .await
}
