//! `EntitySet<T>`: the per-table façade a [`crate::Session`] hands out.
//!
//! Staging (`add`/`update`/`remove`) is pure bookkeeping against a
//! [`ChangeTracker`] — no I/O. Reads (`find`/`to_list`/`find_where`/
//! `count`/`any`) go straight to the database every time and are never
//! registered with the tracker: there is no identity map here, so a read
//! and a later `update`/`remove` of the same row are entirely independent
//! until the caller explicitly stages one.

use crate::change_tracker::{ChangeTracker, EntityState, TrackingHandle};
use crate::querybuilder::QueryBuilder;
use pgforge_types::{Entity, Result, SqlExecutor, SqlValue};

/// Per-table staging plus read access. Reads require a `SqlExecutor`
/// because they always hit the database; staging never does.
pub struct EntitySet<T: Entity> {
    tracker: ChangeTracker<T>,
    /// Auto-increment primary keys assigned by `flush_pending`, applied to
    /// the tracker only once `commit_pending` confirms the transaction
    /// committed — so a rolled-back save leaves the tracker exactly as it
    /// was before `save_changes` ran.
    pending_pk_assignments: Vec<(TrackingHandle, SqlValue)>,
}

impl<T: Entity> Default for EntitySet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> EntitySet<T> {
    pub fn new() -> Self {
        Self { tracker: ChangeTracker::new(), pending_pk_assignments: Vec::new() }
    }

    fn handle_for_pk(&self, pk: &SqlValue) -> Option<TrackingHandle> {
        self.tracker
            .iter()
            .find(|&(_, entity, state)| state != EntityState::Deleted && &entity.primary_key_value() == pk)
            .map(|(handle, _, _)| handle)
    }

    /// Stages a new row for insertion.
    pub fn add(&mut self, entity: T) -> TrackingHandle {
        let handle = self.tracker.allocate_handle();
        self.tracker.track_add(handle, entity);
        handle
    }

    pub fn add_range(&mut self, entities: impl IntoIterator<Item = T>) -> Vec<TrackingHandle> {
        entities.into_iter().map(|entity| self.add(entity)).collect()
    }

    /// Stages a mutation against whichever already-staged row shares
    /// `entity`'s primary key, or starts tracking it fresh as Modified
    /// (there's no identity map, so a row freshly read via `find`/`to_list`
    /// is always "absent" from the tracker's point of view).
    pub fn update(&mut self, entity: T) -> TrackingHandle {
        let pk = entity.primary_key_value();
        let handle = match self.handle_for_pk(&pk) {
            Some(handle) => handle,
            None => self.tracker.allocate_handle(),
        };
        self.tracker.track_modify(handle, entity);
        handle
    }

    /// Stages a deletion for `entity`'s primary key. Works whether or not
    /// `entity` was previously staged this session — there's no identity
    /// map, so the common "read via `find`/`to_list`, then delete" path
    /// must still produce a tracked Deleted entry from nothing.
    pub fn remove(&mut self, entity: &T) {
        let pk = entity.primary_key_value();
        let handle = match self.handle_for_pk(&pk) {
            Some(handle) => handle,
            None => self.tracker.allocate_handle(),
        };
        self.tracker.track_delete(handle, entity.clone());
    }

    pub fn remove_range<'a>(&mut self, entities: impl IntoIterator<Item = &'a T>)
    where
        T: 'a,
    {
        for entity in entities {
            self.remove(entity);
        }
    }

    /// The tracker backing this set, for [`crate::Session::save_changes`] to
    /// walk when flushing pending work.
    pub fn tracker(&self) -> &ChangeTracker<T> {
        &self.tracker
    }

    /// Runs this set's pending Added/Modified/Deleted statements, in that
    /// order, against `executor`. Returns the total affected-row count.
    /// Does not mutate tracker state beyond remembering auto-increment PKs
    /// to assign once the whole save is known to have committed.
    pub(crate) fn flush_pending(&mut self, executor: &mut dyn SqlExecutor) -> Result<u64> {
        let descriptor = T::descriptor();
        let pending = self.tracker.pending_changes();
        let added: Vec<_> = pending.iter().filter(|(_, _, state)| *state == EntityState::Added).cloned().collect();
        let modified: Vec<_> = pending.iter().filter(|(_, _, state)| *state == EntityState::Modified).cloned().collect();
        let deleted: Vec<_> = pending.iter().filter(|(_, _, state)| *state == EntityState::Deleted).cloned().collect();

        let mut affected = 0u64;

        for (handle, entity, _) in added {
            let row: Vec<SqlValue> = descriptor.columns.iter().map(|c| entity.column_value(c)).collect();
            let (sql, params) = QueryBuilder::insert(descriptor, &row);
            if descriptor.primary_key().is_auto_increment {
                let rows = executor.query(&sql, &params)?;
                if let Some(returned) = rows.first() {
                    if let Some(pk) = returned.get(&descriptor.primary_key().name) {
                        self.pending_pk_assignments.push((handle, pk.clone()));
                    }
                }
                affected += 1;
            } else {
                affected += executor.execute(&sql, &params)?;
            }
        }

        for (_, entity, _) in modified {
            let row: Vec<SqlValue> = descriptor.columns.iter().map(|c| entity.column_value(c)).collect();
            let (sql, params) = QueryBuilder::update(descriptor, &row);
            affected += executor.execute(&sql, &params)?;
        }

        for (_, entity, _) in deleted {
            let (sql, params) = QueryBuilder::delete_by_id(descriptor, entity.primary_key_value());
            affected += executor.execute(&sql, &params)?;
        }

        Ok(affected)
    }

    /// Applies PKs assigned during `flush_pending` and resets tracker state,
    /// after `Session::save_changes` has committed successfully.
    pub(crate) fn commit_pending(&mut self) {
        for (handle, pk) in self.pending_pk_assignments.drain(..) {
            if let Some(entity) = self.tracker.entity_of(handle) {
                let mut entity = entity.clone();
                entity.set_primary_key_value(pk);
                self.tracker.replace_entity(handle, entity);
            }
        }
        self.tracker.accept_all_changes();
    }

    /// Discards any PK assignments staged during a `flush_pending` call
    /// whose transaction was rolled back. Tracker state is untouched.
    pub(crate) fn discard_pending(&mut self) {
        self.pending_pk_assignments.clear();
    }

    /// `SELECT ALL`, materialized via `T::from_row`.
    pub fn to_list(&self, executor: &mut dyn SqlExecutor) -> Result<Vec<T>> {
        let descriptor = T::descriptor();
        let sql = QueryBuilder::select_all(descriptor);
        executor.query(&sql, &[])?.iter().map(T::from_row).collect()
    }

    /// `SELECT BY ID`, the first (and only) row or none.
    pub fn find(&self, executor: &mut dyn SqlExecutor, id: SqlValue) -> Result<Option<T>> {
        let descriptor = T::descriptor();
        let (sql, params) = QueryBuilder::select_by_id(descriptor, id);
        let rows = executor.query(&sql, &params)?;
        rows.first().map(T::from_row).transpose()
    }

    /// `SELECT WHERE`, with an optional raw fragment (the caller's own
    /// `@pN` params bound alongside it) and optional ordering.
    pub fn find_where(
        &self,
        executor: &mut dyn SqlExecutor,
        where_fragment: Option<&str>,
        params: &[SqlValue],
        order_by: Option<(&str, bool)>,
    ) -> Result<Vec<T>> {
        let descriptor = T::descriptor();
        let sql = QueryBuilder::select_where(descriptor, where_fragment, order_by);
        executor.query(&sql, params)?.iter().map(T::from_row).collect()
    }

    pub fn first_or_default(
        &self,
        executor: &mut dyn SqlExecutor,
        where_fragment: Option<&str>,
        params: &[SqlValue],
    ) -> Result<Option<T>> {
        Ok(self.find_where(executor, where_fragment, params, None)?.into_iter().next())
    }

    /// `SELECT COUNT(*) FROM "T" [WHERE <fragment>];`
    pub fn count(&self, executor: &mut dyn SqlExecutor, where_fragment: Option<&str>, params: &[SqlValue]) -> Result<i64> {
        let descriptor = T::descriptor();
        let sql = QueryBuilder::count(descriptor, where_fragment);
        match executor.query_scalar(&sql, params)? {
            Some(SqlValue::I64(n)) => Ok(n),
            Some(SqlValue::I32(n)) => Ok(n as i64),
            _ => Ok(0),
        }
    }

    pub fn any(&self, executor: &mut dyn SqlExecutor, where_fragment: Option<&str>, params: &[SqlValue]) -> Result<bool> {
        Ok(self.count(executor, where_fragment, params)? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgforge_types::{ColumnDescriptor, EntityDescriptor, PgForgeError, RowData, SqlType};
    use std::sync::OnceLock;

    #[derive(Debug, Clone)]
    struct Patient {
        id: i32,
        first_name: String,
    }

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: OnceLock<EntityDescriptor> = OnceLock::new();
        DESCRIPTOR.get_or_init(|| EntityDescriptor {
            table_name: "Patients".to_string(),
            primary_key_index: 0,
            columns: vec![
                ColumnDescriptor {
                    name: "Id".to_string(),
                    sql_type: SqlType::Integer,
                    nullable: false,
                    is_primary_key: true,
                    is_auto_increment: true,
                    is_unique: false,
                    default_value: None,
                    foreign_key: None,
                    length: None,
                },
                ColumnDescriptor {
                    name: "FirstName".to_string(),
                    sql_type: SqlType::String,
                    nullable: false,
                    is_primary_key: false,
                    is_auto_increment: false,
                    is_unique: false,
                    default_value: None,
                    foreign_key: None,
                    length: None,
                },
            ],
        })
    }

    impl Entity for Patient {
        fn descriptor() -> &'static EntityDescriptor {
            descriptor()
        }

        fn column_value(&self, column: &ColumnDescriptor) -> SqlValue {
            match column.name.as_str() {
                "Id" => SqlValue::I32(self.id),
                "FirstName" => SqlValue::Text(self.first_name.clone()),
                other => unreachable!("unmapped column {other}"),
            }
        }

        fn set_column_value(&mut self, column: &ColumnDescriptor, value: SqlValue) {
            match column.name.as_str() {
                "Id" => {
                    if let SqlValue::I32(v) = value {
                        self.id = v;
                    }
                }
                "FirstName" => {
                    if let SqlValue::Text(v) = value {
                        self.first_name = v;
                    }
                }
                other => unreachable!("unmapped column {other}"),
            }
        }

        fn from_row(row: &RowData) -> Result<Self> {
            Ok(Patient {
                id: match row.get("Id") {
                    Some(SqlValue::I32(v)) => *v,
                    _ => 0,
                },
                first_name: match row.get("FirstName") {
                    Some(SqlValue::Text(v)) => v.clone(),
                    _ => String::new(),
                },
            })
        }
    }

    #[derive(Default)]
    struct FakeTable {
        rows: Vec<RowData>,
        executed: Vec<String>,
    }

    impl SqlExecutor for FakeTable {
        fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
            self.executed.push(sql.to_string());
            if sql.starts_with("DELETE FROM \"Patients\"") {
                let SqlValue::I32(id) = &params[0] else { panic!("expected i32 id") };
                let before = self.rows.len();
                self.rows.retain(|row| row.get("Id") != Some(&SqlValue::I32(*id)));
                return Ok((before - self.rows.len()) as u64);
            }
            Err(PgForgeError::QueryExecution("not used in these tests".to_string()))
        }

        fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<RowData>> {
            self.executed.push(sql.to_string());
            if sql.contains("WHERE \"Id\" = @p0") {
                let SqlValue::I32(id) = &params[0] else { panic!("expected i32 id") };
                return Ok(self
                    .rows
                    .iter()
                    .filter(|row| row.get("Id") == Some(&SqlValue::I32(*id)))
                    .cloned()
                    .collect());
            }
            Ok(self.rows.clone())
        }

        fn query_scalar(&mut self, _sql: &str, _params: &[SqlValue]) -> Result<Option<SqlValue>> {
            Ok(Some(SqlValue::I64(self.rows.len() as i64)))
        }
    }

    fn patient_row(id: i32, name: &str) -> RowData {
        RowData::new(vec![("Id".to_string(), SqlValue::I32(id)), ("FirstName".to_string(), SqlValue::Text(name.to_string()))])
    }

    #[test]
    fn add_stages_without_touching_the_database() {
        let mut set: EntitySet<Patient> = EntitySet::new();
        set.add(Patient { id: 0, first_name: "Ana".to_string() });
        assert!(set.tracker().has_changes());
    }

    #[test]
    fn to_list_reads_straight_from_the_executor() {
        let set: EntitySet<Patient> = EntitySet::new();
        let mut table = FakeTable { rows: vec![patient_row(1, "Ana"), patient_row(2, "Ivo")], ..Default::default() };
        let patients = set.to_list(&mut table).unwrap();
        assert_eq!(patients.len(), 2);
    }

    #[test]
    fn find_returns_none_when_no_row_matches() {
        let set: EntitySet<Patient> = EntitySet::new();
        let mut table = FakeTable { rows: vec![patient_row(1, "Ana")], ..Default::default() };
        assert!(set.find(&mut table, SqlValue::I32(99)).unwrap().is_none());
        assert_eq!(set.find(&mut table, SqlValue::I32(1)).unwrap().unwrap().first_name, "Ana");
    }

    #[test]
    fn update_on_a_freshly_read_row_starts_from_absent() {
        let mut set: EntitySet<Patient> = EntitySet::new();
        let mut table = FakeTable { rows: vec![patient_row(1, "Ana")], ..Default::default() };
        let found = set.find(&mut table, SqlValue::I32(1)).unwrap().unwrap();
        set.update(Patient { first_name: "Anamarija".to_string(), ..found });
        assert_eq!(set.tracker().pending_changes().len(), 1);
    }

    #[test]
    fn removing_a_freshly_read_row_issues_a_delete_and_it_stops_being_found() {
        let mut set: EntitySet<Patient> = EntitySet::new();
        let mut table = FakeTable { rows: vec![patient_row(1, "Ana")], ..Default::default() };
        let found = set.find(&mut table, SqlValue::I32(1)).unwrap().unwrap();

        set.remove(&found);
        assert_eq!(set.tracker().pending_changes().len(), 1);

        set.flush_pending(&mut table).unwrap();
        assert!(table.executed.iter().any(|sql| sql.starts_with("DELETE FROM \"Patients\"")));
        assert!(set.find(&mut table, SqlValue::I32(1)).unwrap().is_none());
    }

    #[test]
    fn count_reports_the_executor_scalar() {
        let set: EntitySet<Patient> = EntitySet::new();
        let mut table = FakeTable { rows: vec![patient_row(1, "Ana"), patient_row(2, "Ivo")], ..Default::default() };
        assert_eq!(set.count(&mut table, None, &[]).unwrap(), 2);
        assert!(set.any(&mut table, None, &[]).unwrap());
    }
}
