use anyhow::Context;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Booking, BookingStatus};
use crate::services::store::BookingSnapshot;

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const NEXT_ID_KEY: &str = "next_booking_id";

// ── Snapshots ──

pub fn load_snapshot(conn: &Connection) -> anyhow::Result<Option<BookingSnapshot>> {
    let next_id: Option<i64> = conn
        .query_row(
            "SELECT value FROM store_meta WHERE key = ?1",
            params![NEXT_ID_KEY],
            |row| row.get(0),
        )
        .optional()?;

    let Some(next_id) = next_id else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT id, customer_name, customer_email, customer_phone, service_id, staff_id, scheduled_at, status, notes
         FROM bookings ORDER BY position ASC",
    )?;

    let rows = stmt.query_map([], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }

    Ok(Some(BookingSnapshot {
        next_id: u64::try_from(next_id).context("negative booking counter")?,
        bookings,
    }))
}

/// Replaces the stored collection in one transaction.
pub fn save_snapshot(conn: &mut Connection, snapshot: &BookingSnapshot) -> anyhow::Result<()> {
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM bookings", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO bookings (id, position, customer_name, customer_email, customer_phone, service_id, staff_id, scheduled_at, status, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for (position, booking) in snapshot.bookings.iter().enumerate() {
            stmt.execute(params![
                to_sql_id(booking.id)?,
                position as i64,
                booking.customer_name,
                booking.customer_email,
                booking.customer_phone,
                to_sql_id(booking.service_id)?,
                to_sql_id(booking.staff_id)?,
                booking.scheduled_at.format(DATE_TIME_FORMAT).to_string(),
                booking.status.as_str(),
                booking.notes,
            ])?;
        }
    }

    tx.execute(
        "INSERT INTO store_meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![NEXT_ID_KEY, to_sql_id(snapshot.next_id)?],
    )?;

    tx.commit()?;
    Ok(())
}

fn to_sql_id(id: u64) -> anyhow::Result<i64> {
    i64::try_from(id).with_context(|| format!("id out of range: {id}"))
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: i64 = row.get(0)?;
    let customer_name: String = row.get(1)?;
    let customer_email: String = row.get(2)?;
    let customer_phone: String = row.get(3)?;
    let service_id: i64 = row.get(4)?;
    let staff_id: i64 = row.get(5)?;
    let scheduled_at_str: String = row.get(6)?;
    let status_str: String = row.get(7)?;
    let notes: String = row.get(8)?;

    let scheduled_at = NaiveDateTime::parse_from_str(&scheduled_at_str, DATE_TIME_FORMAT)
        .with_context(|| format!("booking {id} has a malformed date: {scheduled_at_str}"))?;
    let status = BookingStatus::parse(&status_str)
        .with_context(|| format!("booking {id} has an unknown status: {status_str}"))?;

    Ok(Booking {
        id: u64::try_from(id)?,
        customer_name,
        customer_email,
        customer_phone,
        service_id: u64::try_from(service_id)?,
        staff_id: u64::try_from(staff_id)?,
        scheduled_at,
        status,
        notes,
    })
}
