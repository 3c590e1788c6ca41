//! End-to-end coverage against an in-memory table fake, no live Postgres
//! needed: a round-trip add/update/remove, a unique-constraint failure that
//! leaves the tracker retryable, and eager collection loading.

use pgforge::{ColumnDescriptor, Entity, EntityDescriptor, EntitySet, ForeignKeyDescriptor, IncludeLoader, PgForgeError, Result, RowData, Session, SqlExecutor, SqlType, SqlValue};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq)]
struct Patient {
    id: i32,
    first_name: String,
    last_name: String,
    oib: String,
}

fn patient_descriptor() -> &'static EntityDescriptor {
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
                length: Some(50),
            },
            ColumnDescriptor {
                name: "LastName".to_string(),
                sql_type: SqlType::String,
                nullable: false,
                is_primary_key: false,
                is_auto_increment: false,
                is_unique: false,
                default_value: None,
                foreign_key: None,
                length: Some(50),
            },
            ColumnDescriptor {
                name: "OIB".to_string(),
                sql_type: SqlType::String,
                nullable: false,
                is_primary_key: false,
                is_auto_increment: false,
                is_unique: true,
                default_value: None,
                foreign_key: None,
                length: Some(11),
            },
        ],
    })
}

impl Entity for Patient {
    fn descriptor() -> &'static EntityDescriptor {
        patient_descriptor()
    }

    fn column_value(&self, column: &ColumnDescriptor) -> SqlValue {
        match column.name.as_str() {
            "Id" => SqlValue::I32(self.id),
            "FirstName" => SqlValue::Text(self.first_name.clone()),
            "LastName" => SqlValue::Text(self.last_name.clone()),
            "OIB" => SqlValue::Text(self.oib.clone()),
            other => unreachable!("unmapped column {other}"),
        }
    }

    fn set_column_value(&mut self, column: &ColumnDescriptor, value: SqlValue) {
        match (column.name.as_str(), value) {
            ("Id", SqlValue::I32(v)) => self.id = v,
            ("FirstName", SqlValue::Text(v)) => self.first_name = v,
            ("LastName", SqlValue::Text(v)) => self.last_name = v,
            ("OIB", SqlValue::Text(v)) => self.oib = v,
            _ => {}
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
            last_name: match row.get("LastName") {
                Some(SqlValue::Text(v)) => v.clone(),
                _ => String::new(),
            },
            oib: match row.get("OIB") {
                Some(SqlValue::Text(v)) => v.clone(),
                _ => String::new(),
            },
        })
    }
}

#[derive(Debug, Clone)]
struct MedicalHistory {
    id: i32,
    patient_id: i32,
    note: String,
}

fn history_descriptor() -> &'static EntityDescriptor {
    static DESCRIPTOR: OnceLock<EntityDescriptor> = OnceLock::new();
    DESCRIPTOR.get_or_init(|| EntityDescriptor {
        table_name: "MedicalHistories".to_string(),
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
                name: "PatientId".to_string(),
                sql_type: SqlType::Integer,
                nullable: false,
                is_primary_key: false,
                is_auto_increment: false,
                is_unique: false,
                default_value: None,
                foreign_key: Some(ForeignKeyDescriptor { reference_table: "Patients".to_string(), reference_column: "Id".to_string() }),
                length: None,
            },
            ColumnDescriptor {
                name: "Note".to_string(),
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

impl Entity for MedicalHistory {
    fn descriptor() -> &'static EntityDescriptor {
        history_descriptor()
    }

    fn column_value(&self, column: &ColumnDescriptor) -> SqlValue {
        match column.name.as_str() {
            "Id" => SqlValue::I32(self.id),
            "PatientId" => SqlValue::I32(self.patient_id),
            "Note" => SqlValue::Text(self.note.clone()),
            other => unreachable!("unmapped column {other}"),
        }
    }

    fn set_column_value(&mut self, column: &ColumnDescriptor, value: SqlValue) {
        match (column.name.as_str(), value) {
            ("Id", SqlValue::I32(v)) => self.id = v,
            ("PatientId", SqlValue::I32(v)) => self.patient_id = v,
            ("Note", SqlValue::Text(v)) => self.note = v,
            _ => {}
        }
    }

    fn from_row(row: &RowData) -> Result<Self> {
        Ok(MedicalHistory {
            id: match row.get("Id") {
                Some(SqlValue::I32(v)) => *v,
                _ => 0,
            },
            patient_id: match row.get("PatientId") {
                Some(SqlValue::I32(v)) => *v,
                _ => 0,
            },
            note: match row.get("Note") {
                Some(SqlValue::Text(v)) => v.clone(),
                _ => String::new(),
            },
        })
    }
}

/// An in-memory stand-in for a single Postgres table, enough to exercise
/// `QueryBuilder`-generated SQL: INSERT ... RETURNING, SELECT, SELECT BY ID,
/// UPDATE, DELETE, and a single `OIB` uniqueness constraint.
#[derive(Default)]
struct FakeTable {
    rows: Vec<RowData>,
    next_id: i32,
}

impl FakeTable {
    fn new() -> Self {
        Self { rows: Vec::new(), next_id: 1 }
    }
}

impl SqlExecutor for FakeTable {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        if sql.starts_with("UPDATE") {
            let pk = params.last().cloned().unwrap();
            if let Some(row) = self.rows.iter_mut().find(|r| r.get("Id") == Some(&pk)) {
                *row = RowData::new(vec![
                    ("Id".to_string(), pk),
                    ("FirstName".to_string(), params[0].clone()),
                    ("LastName".to_string(), params[1].clone()),
                    ("OIB".to_string(), params[2].clone()),
                ]);
            }
            return Ok(1);
        }
        if sql.starts_with("DELETE") {
            let pk = &params[0];
            let before = self.rows.len();
            self.rows.retain(|r| r.get("Id") != Some(pk));
            return Ok((before - self.rows.len()) as u64);
        }
        Ok(0)
    }

    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<RowData>> {
        if sql.starts_with("INSERT INTO \"Patients\"") {
            let SqlValue::Text(oib) = &params[2] else { panic!("expected oib text") };
            if self.rows.iter().any(|r| r.get("OIB") == Some(&SqlValue::Text(oib.clone()))) {
                return Err(PgForgeError::QueryExecution(format!("duplicate key value violates unique constraint on OIB {oib}")));
            }
            let id = self.next_id;
            self.next_id += 1;
            let row = RowData::new(vec![
                ("Id".to_string(), SqlValue::I32(id)),
                ("FirstName".to_string(), params[0].clone()),
                ("LastName".to_string(), params[1].clone()),
                ("OIB".to_string(), SqlValue::Text(oib.clone())),
            ]);
            self.rows.push(row);
            return Ok(vec![RowData::new(vec![("Id".to_string(), SqlValue::I32(id))])]);
        }
        if sql.starts_with("SELECT") && sql.contains("WHERE \"Id\" = @p0") {
            let pk = &params[0];
            return Ok(self.rows.iter().filter(|r| r.get("Id") == Some(pk)).cloned().collect());
        }
        Ok(self.rows.clone())
    }

    fn query_scalar(&mut self, _sql: &str, _params: &[SqlValue]) -> Result<Option<SqlValue>> {
        Ok(Some(SqlValue::I64(self.rows.len() as i64)))
    }
}

#[test]
fn crud_round_trip_tracks_pk_assignment_and_deletion() {
    let mut session = Session::new(FakeTable::new());

    let patients: &mut EntitySet<Patient> = session.entity_set::<Patient>();
    patients.add(Patient { id: 0, first_name: "Ana".to_string(), last_name: "Kovač".to_string(), oib: "12345678901".to_string() });
    session.save_changes().unwrap();

    let (patients, executor) = session.entity_set_and_executor::<Patient>();
    let found = patients.find(executor, SqlValue::I32(1)).unwrap().unwrap();
    assert_eq!(found.id, 1);

    let mut updated = found;
    updated.last_name = "Kovač-Novak".to_string();
    session.entity_set::<Patient>().update(updated);
    session.save_changes().unwrap();

    let (patients, executor) = session.entity_set_and_executor::<Patient>();
    let refreshed = patients.find(executor, SqlValue::I32(1)).unwrap().unwrap();
    assert_eq!(refreshed.last_name, "Kovač-Novak");

    session.entity_set::<Patient>().remove(&refreshed);
    session.save_changes().unwrap();

    let (patients, executor) = session.entity_set_and_executor::<Patient>();
    assert!(patients.find(executor, SqlValue::I32(1)).unwrap().is_none());
    let (patients, executor) = session.entity_set_and_executor::<Patient>();
    assert_eq!(patients.count(executor, None, &[]).unwrap(), 0);
}

#[test]
fn duplicate_oib_fails_the_second_save_and_stays_retryable() {
    let mut session = Session::new(FakeTable::new());

    session.entity_set::<Patient>().add(Patient { id: 0, first_name: "Ana".to_string(), last_name: "Kovač".to_string(), oib: "11111111111".to_string() });
    session.save_changes().unwrap();

    session.entity_set::<Patient>().add(Patient { id: 0, first_name: "Ivo".to_string(), last_name: "Babić".to_string(), oib: "11111111111".to_string() });
    let result = session.save_changes();
    assert!(matches!(result, Err(PgForgeError::QueryExecution(_))));

    // The first patient is still there, the second is still pending (not lost).
    let (patients, executor) = session.entity_set_and_executor::<Patient>();
    assert_eq!(patients.count(executor, None, &[]).unwrap(), 1);
    assert!(session.entity_set::<Patient>().tracker().has_changes());
}

#[test]
fn eager_loading_groups_three_histories_under_one_patient() {
    let patient = Patient { id: 7, first_name: "Ana".to_string(), last_name: "Kovač".to_string(), oib: "12345678901".to_string() };
    let histories = vec![
        RowData::new(vec![("Id".to_string(), SqlValue::I32(1)), ("PatientId".to_string(), SqlValue::I32(7)), ("Note".to_string(), SqlValue::Text("flu".to_string()))]),
        RowData::new(vec![("Id".to_string(), SqlValue::I32(2)), ("PatientId".to_string(), SqlValue::I32(7)), ("Note".to_string(), SqlValue::Text("checkup".to_string()))]),
        RowData::new(vec![("Id".to_string(), SqlValue::I32(3)), ("PatientId".to_string(), SqlValue::I32(7)), ("Note".to_string(), SqlValue::Text("vaccine".to_string()))]),
    ];

    struct HistoryTable(Vec<RowData>);
    impl SqlExecutor for HistoryTable {
        fn execute(&mut self, _sql: &str, _params: &[SqlValue]) -> Result<u64> {
            Ok(0)
        }
        fn query(&mut self, _sql: &str, params: &[SqlValue]) -> Result<Vec<RowData>> {
            let wanted = params[0].clone();
            Ok(self.0.iter().filter(|r| r.get("PatientId") == Some(&wanted)).cloned().collect())
        }
        fn query_scalar(&mut self, _sql: &str, _params: &[SqlValue]) -> Result<Option<SqlValue>> {
            Ok(None)
        }
    }

    let mut executor = HistoryTable(histories);
    let grouped = IncludeLoader::load_collection::<Patient, MedicalHistory>(&mut executor, &[patient], None).unwrap();
    let for_patient_7 = grouped.values().next().expect("one owner group");
    assert_eq!(for_patient_7.len(), 3);
    assert!(for_patient_7.iter().all(|h| h.patient_id == 7));
}
