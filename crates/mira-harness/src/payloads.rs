//! Canonical iteration payloads the harness fabricates in place of the
//! production search backend.

use mira_storage::{CallbackPayload, PropertyListing};

const THUMB_BASE: &str = "https://img4.idealista.com/blur/WEB_DETAIL_TOP-XL-P/0/id.pro.es.image.master";

fn listing(
    property_id: &str,
    title: &str,
    image_path: &str,
    price: f64,
    floor: &str,
    size: f64,
) -> PropertyListing {
    let url = format!("{THUMB_BASE}/{image_path}");
    PropertyListing {
        property_id: property_id.to_string(),
        title: title.to_string(),
        thumbnail: url.clone(),
        price,
        floor: floor.to_string(),
        size,
        rooms: 2,
        bathrooms: 1,
        images: vec![url],
    }
}

/// Canonical payload for one iteration of the conversation, or `None` past
/// the scripted range.
pub fn payload_for_iteration(iteration: u32) -> Option<CallbackPayload> {
    match iteration {
        1 => Some(CallbackPayload {
            message:
                "¡Perfecto! He encontrado algunas propiedades que coinciden con tus criterios iniciales:"
                    .to_string(),
            properties: vec![
                listing(
                    "iter1_prop1",
                    "Piso en Chamberí",
                    "e9/3a/4c/1340892243.webp",
                    280_000.0,
                    "3",
                    70.0,
                ),
                listing(
                    "iter1_prop2",
                    "Apartamento en Malasaña",
                    "12/34/56/1340892244.webp",
                    295_000.0,
                    "2",
                    65.0,
                ),
            ],
        }),
        2 => Some(CallbackPayload {
            message:
                "¡Excelente! He refinado la búsqueda para zonas más céntricas. Aquí tienes opciones mejoradas:"
                    .to_string(),
            properties: vec![
                listing(
                    "iter2_prop1",
                    "Piso en Sol",
                    "aa/bb/cc/1340892245.webp",
                    285_000.0,
                    "4",
                    68.0,
                ),
                listing(
                    "iter2_prop2",
                    "Apartamento en Chueca",
                    "dd/ee/ff/1340892246.webp",
                    299_000.0,
                    "5",
                    72.0,
                ),
            ],
        }),
        3 => Some(CallbackPayload {
            message:
                "¡Fantástico! He encontrado propiedades céntricas con terraza que se ajustan perfectamente:"
                    .to_string(),
            properties: vec![listing(
                "iter3_prop1",
                "Ático con terraza en Malasaña",
                "gg/hh/ii/1340892247.webp",
                290_000.0,
                "6",
                75.0,
            )],
        }),
        _ => None,
    }
}

/// Oversized payload for the large-callback stress scenario.
pub fn bulk_payload(count: usize) -> CallbackPayload {
    let properties = (0..count)
        .map(|index| {
            let mut item = listing(
                &format!("large_test_{index}"),
                &format!("Propiedad de prueba número {} con título muy largo", index + 1),
                "e9/3a/4c/1340892243.webp",
                200_000.0 + (index as f64 * 10_000.0),
                &format!("{}", index / 10 + 1),
                50.0 + (index as f64 * 2.0),
            );
            item.rooms = (index % 4 + 1) as u32;
            item.bathrooms = (index % 3 + 1) as u32;
            item
        })
        .collect();
    CallbackPayload {
        message: "Aquí tienes una gran cantidad de propiedades:".to_string(),
        properties,
    }
}
