//! `Session`: owns one [`SqlExecutor`] plus one [`EntitySet`] per entity
//! type touched so far, and flushes staged work in a single transaction.
//!
//! Entity sets are created lazily and keyed by `TypeId`, since a generic
//! session can't know its application's entity types ahead of time the way
//! a hand-written `DbContext` subclass would. `entity_set::<T>()` is the
//! first call site for any entity type; it's idempotent.

use crate::entity_set::EntitySet;
use pgforge_types::{Entity, PgForgeError, Result, SqlExecutor, SqlValue};
use std::any::{Any, TypeId};
use std::collections::HashMap;

trait ErasedEntitySet: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn flush(&mut self, executor: &mut dyn SqlExecutor) -> Result<u64>;
    fn commit(&mut self);
    fn discard(&mut self);
}

impl<T: Entity> ErasedEntitySet for EntitySet<T> {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn flush(&mut self, executor: &mut dyn SqlExecutor) -> Result<u64> {
        self.flush_pending(executor)
    }

    fn commit(&mut self) {
        self.commit_pending();
    }

    fn discard(&mut self) {
        self.discard_pending();
    }
}

/// One unit-of-work scope: a live connection (via `E: SqlExecutor`) plus
/// whatever entity sets have been touched through it.
pub struct Session<E: SqlExecutor> {
    executor: E,
    sets: HashMap<TypeId, Box<dyn ErasedEntitySet>>,
    registration_order: Vec<TypeId>,
}

impl<E: SqlExecutor> Session<E> {
    pub fn new(executor: E) -> Self {
        Self { executor, sets: HashMap::new(), registration_order: Vec::new() }
    }

    /// The entity set for `T`, created on first access.
    pub fn entity_set<T: Entity>(&mut self) -> &mut EntitySet<T> {
        self.entity_set_and_executor::<T>().0
    }

    /// The entity set for `T` together with the session's executor,
    /// borrowed disjointly so a caller can immediately issue a read (e.g.
    /// `set.find(executor, id)`) without a second borrow of `self`.
    pub fn entity_set_and_executor<T: Entity>(&mut self) -> (&mut EntitySet<T>, &mut E) {
        let type_id = TypeId::of::<T>();
        if !self.sets.contains_key(&type_id) {
            self.sets.insert(type_id, Box::new(EntitySet::<T>::new()));
            self.registration_order.push(type_id);
        }
        let set = self
            .sets
            .get_mut(&type_id)
            .expect("just inserted")
            .as_any_mut()
            .downcast_mut::<EntitySet<T>>()
            .expect("TypeId-keyed registry holds EntitySet<T> under T's TypeId");
        (set, &mut self.executor)
    }

    /// Flushes every entity set's pending Added/Modified/Deleted statements
    /// within one transaction, in the order each set was first touched.
    /// Auto-increment primary keys are assigned back onto Added entities
    /// only once the transaction commits; any failure leaves every
    /// tracker's entries in their pre-call states.
    pub fn save_changes(&mut self) -> Result<u64> {
        self.executor.execute("BEGIN;", &[])?;

        let mut total = 0u64;
        for type_id in &self.registration_order {
            let set = self.sets.get_mut(type_id).expect("registered");
            match set.flush(&mut self.executor) {
                Ok(affected) => total += affected,
                Err(err) => {
                    let _ = self.executor.execute("ROLLBACK;", &[]);
                    for type_id in &self.registration_order {
                        self.sets.get_mut(type_id).expect("registered").discard();
                    }
                    return Err(err);
                }
            }
        }

        self.executor.execute("COMMIT;", &[])?;
        for type_id in &self.registration_order {
            self.sets.get_mut(type_id).expect("registered").commit();
        }
        Ok(total)
    }

    /// The underlying executor, for callers reading through an
    /// [`EntitySet`] directly (its read methods take the executor
    /// explicitly rather than borrowing one back out of `Session`).
    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn execute_sql(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        self.executor.execute(sql, params)
    }

    pub fn table_exists(&mut self, name: &str) -> Result<bool> {
        let sql = "SELECT 1 FROM information_schema.tables WHERE table_name = @p0;";
        let found = self.executor.query_scalar(sql, &[SqlValue::Text(name.to_string())])?;
        Ok(found.is_some())
    }

    pub fn dispose(&mut self) {
        self.sets.clear();
        self.registration_order.clear();
    }
}
