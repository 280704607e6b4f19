//! A small seeded campus
//!
//! | id  | role      | notes                                   |
//! |-----|-----------|-----------------------------------------|
//! | a1  | admin     |                                         |
//! | d1  | dosen     |                                         |
//! | l1  | laboran   |                                         |
//! | m1  | mahasiswa | owns report r1, booking b1, attends c1  |
//! | m2  | mahasiswa | owns report r2, expired reports:export  |
//! | m3  | mahasiswa | inactive                                |

use labgate_store::MemoryBackend;
use labgate_types::Role;

use crate::{booking, expired_grant, inactive_principal, principal, report};

pub async fn campus_backend() -> MemoryBackend {
    let backend = MemoryBackend::new();

    backend.put_principal(principal("a1", Role::Admin)).await;
    backend.put_principal(principal("d1", Role::Dosen)).await;
    backend.put_principal(principal("l1", Role::Laboran)).await;
    backend.put_principal(principal("m1", Role::Mahasiswa)).await;
    backend.put_principal(principal("m2", Role::Mahasiswa)).await;
    backend.put_principal(inactive_principal("m3", Role::Mahasiswa)).await;

    backend.put_resource(report("r1", "m1")).await;
    backend.put_resource(report("r2", "m2")).await;
    backend.put_resource(booking("b1", "m1")).await;

    backend.record_attendance("m1", "c1").await;

    backend.add_grant(expired_grant("m2", "reports:export")).await;

    backend
}
