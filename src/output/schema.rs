//! Fixed Arrow schema for lift ticket batches
//!
//! Eleven columns, named after the destination table's columns. The two
//! structured optionals (ADDRESS, EMERGENCY_CONTACT) are nested struct
//! columns; an absent value is a null struct, never a row of empty strings.

use crate::error::{Error, Result};
use crate::ticket::{Address, EmergencyContact, LiftTicket};
use arrow::array::{
    Array, ArrayRef, Date32Array, Int32Array, StringArray, StructArray,
    TimestampMicrosecondArray,
};
use arrow::buffer::NullBuffer;
use arrow::datatypes::{DataType, Field, Fields, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use std::sync::Arc;

fn unix_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
}

/// Child fields of the ADDRESS struct column
fn address_fields() -> Fields {
    Fields::from(vec![
        Field::new("street_address", DataType::Utf8, true),
        Field::new("city", DataType::Utf8, true),
        Field::new("state", DataType::Utf8, true),
        Field::new("postalcode", DataType::Utf8, true),
    ])
}

/// Child fields of the EMERGENCY_CONTACT struct column
fn emergency_contact_fields() -> Fields {
    Fields::from(vec![
        Field::new("name", DataType::Utf8, true),
        Field::new("phone", DataType::Utf8, true),
    ])
}

/// The fixed 11-column schema for staged lift ticket files
pub fn ticket_schema() -> Schema {
    Schema::new(vec![
        Field::new("TXID", DataType::Utf8, false),
        Field::new("RFID", DataType::Utf8, false),
        Field::new("RESORT", DataType::Utf8, false),
        Field::new(
            "PURCHASE_TIME",
            DataType::Timestamp(TimeUnit::Microsecond, Some(Arc::from("UTC"))),
            false,
        ),
        Field::new("EXPIRATION_TIME", DataType::Date32, false),
        Field::new("DAYS", DataType::Int32, false),
        Field::new("NAME", DataType::Utf8, false),
        Field::new("ADDRESS", DataType::Struct(address_fields()), true),
        Field::new("PHONE", DataType::Utf8, true),
        Field::new("EMAIL", DataType::Utf8, true),
        Field::new(
            "EMERGENCY_CONTACT",
            DataType::Struct(emergency_contact_fields()),
            true,
        ),
    ])
}

/// Convert an ordered ticket batch into a RecordBatch with [`ticket_schema`].
///
/// Timestamps are truncated to microsecond precision.
pub fn tickets_to_arrow(tickets: &[LiftTicket]) -> Result<RecordBatch> {
    let txid: StringArray = tickets.iter().map(|t| Some(t.txid.as_str())).collect();
    let rfid: StringArray = tickets.iter().map(|t| Some(t.rfid.as_str())).collect();
    let resort: StringArray = tickets.iter().map(|t| Some(t.resort.as_str())).collect();

    let purchase_time = TimestampMicrosecondArray::from_iter_values(
        tickets.iter().map(|t| t.purchase_time.timestamp_micros()),
    )
    .with_timezone("UTC");

    let expiration_time = Date32Array::from_iter_values(
        tickets
            .iter()
            .map(|t| (t.expiration_time - unix_epoch()).num_days() as i32),
    );

    let days = Int32Array::from_iter_values(tickets.iter().map(|t| t.days));
    let name: StringArray = tickets.iter().map(|t| Some(t.name.as_str())).collect();

    let address = build_address_column(tickets);
    let phone: StringArray = tickets.iter().map(|t| t.phone.as_deref()).collect();
    let email: StringArray = tickets.iter().map(|t| t.email.as_deref()).collect();
    let emergency_contact = build_emergency_contact_column(tickets);

    let columns: Vec<ArrayRef> = vec![
        Arc::new(txid),
        Arc::new(rfid),
        Arc::new(resort),
        Arc::new(purchase_time),
        Arc::new(expiration_time),
        Arc::new(days),
        Arc::new(name),
        address,
        Arc::new(phone),
        Arc::new(email),
        emergency_contact,
    ];

    RecordBatch::try_new(Arc::new(ticket_schema()), columns).map_err(Error::from)
}

fn addr(t: &LiftTicket) -> Option<&Address> {
    t.address.as_ref()
}

fn contact(t: &LiftTicket) -> Option<&EmergencyContact> {
    t.emergency_contact.as_ref()
}

fn build_address_column(tickets: &[LiftTicket]) -> ArrayRef {
    let street: StringArray = tickets
        .iter()
        .map(|t| addr(t).map(|a| a.street_address.as_str()))
        .collect();
    let city: StringArray = tickets
        .iter()
        .map(|t| addr(t).map(|a| a.city.as_str()))
        .collect();
    let state: StringArray = tickets
        .iter()
        .map(|t| addr(t).map(|a| a.state.as_str()))
        .collect();
    let postalcode: StringArray = tickets
        .iter()
        .map(|t| addr(t).map(|a| a.postalcode.as_str()))
        .collect();

    let validity = NullBuffer::from(
        tickets
            .iter()
            .map(|t| t.address.is_some())
            .collect::<Vec<bool>>(),
    );

    Arc::new(StructArray::new(
        address_fields(),
        vec![
            Arc::new(street),
            Arc::new(city),
            Arc::new(state),
            Arc::new(postalcode),
        ],
        Some(validity),
    ))
}

fn build_emergency_contact_column(tickets: &[LiftTicket]) -> ArrayRef {
    let name: StringArray = tickets
        .iter()
        .map(|t| contact(t).map(|c| c.name.as_str()))
        .collect();
    let phone: StringArray = tickets
        .iter()
        .map(|t| contact(t).map(|c| c.phone.as_str()))
        .collect();

    let validity = NullBuffer::from(
        tickets
            .iter()
            .map(|t| t.emergency_contact.is_some())
            .collect::<Vec<bool>>(),
    );

    Arc::new(StructArray::new(
        emergency_contact_fields(),
        vec![Arc::new(name), Arc::new(phone)],
        Some(validity),
    ))
}

/// Convert a RecordBatch written by [`tickets_to_arrow`] back into tickets.
///
/// Inverse of serialization; the round-trip backs reconciliation tooling and
/// the writer's own tests.
pub fn arrow_to_tickets(batch: &RecordBatch) -> Result<Vec<LiftTicket>> {
    let txid = string_column(batch, "TXID")?;
    let rfid = string_column(batch, "RFID")?;
    let resort = string_column(batch, "RESORT")?;
    let purchase_time = downcast::<TimestampMicrosecondArray>(batch, "PURCHASE_TIME")?;
    let expiration_time = downcast::<Date32Array>(batch, "EXPIRATION_TIME")?;
    let days = downcast::<Int32Array>(batch, "DAYS")?;
    let name = string_column(batch, "NAME")?;
    let address = downcast::<StructArray>(batch, "ADDRESS")?;
    let phone = string_column(batch, "PHONE")?;
    let email = string_column(batch, "EMAIL")?;
    let emergency_contact = downcast::<StructArray>(batch, "EMERGENCY_CONTACT")?;

    let mut tickets = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let ts = DateTime::<Utc>::from_timestamp_micros(purchase_time.value(row))
            .ok_or_else(|| Error::serialization("timestamp out of range"))?;
        tickets.push(LiftTicket {
            txid: txid.value(row).to_string(),
            rfid: rfid.value(row).to_string(),
            resort: resort.value(row).to_string(),
            purchase_time: ts,
            expiration_time: unix_epoch() + TimeDelta::days(expiration_time.value(row) as i64),
            days: days.value(row),
            name: name.value(row).to_string(),
            address: read_address(address, row)?,
            phone: optional_string(phone, row),
            email: optional_string(email, row),
            emergency_contact: read_emergency_contact(emergency_contact, row)?,
        });
    }
    Ok(tickets)
}

fn read_address(column: &StructArray, row: usize) -> Result<Option<Address>> {
    if column.is_null(row) {
        return Ok(None);
    }
    Ok(Some(Address {
        street_address: struct_string(column, "street_address", row)?,
        city: struct_string(column, "city", row)?,
        state: struct_string(column, "state", row)?,
        postalcode: struct_string(column, "postalcode", row)?,
    }))
}

fn read_emergency_contact(column: &StructArray, row: usize) -> Result<Option<EmergencyContact>> {
    if column.is_null(row) {
        return Ok(None);
    }
    Ok(Some(EmergencyContact {
        name: struct_string(column, "name", row)?,
        phone: struct_string(column, "phone", row)?,
    }))
}

fn struct_string(column: &StructArray, field: &str, row: usize) -> Result<String> {
    let child = column
        .column_by_name(field)
        .ok_or_else(|| Error::serialization(format!("missing struct field '{field}'")))?;
    let child = child
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::serialization(format!("struct field '{field}' is not Utf8")))?;
    Ok(child.value(row).to_string())
}

fn optional_string(column: &StringArray, row: usize) -> Option<String> {
    if column.is_null(row) {
        None
    } else {
        Some(column.value(row).to_string())
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    downcast::<StringArray>(batch, name)
}

fn downcast<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| Error::serialization(format!("missing column '{name}'")))?;
    column
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::serialization(format!("unexpected type for column '{name}'")))
}
