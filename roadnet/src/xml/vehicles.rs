// Park destinations live in the savegame's vehicles.xml, next to the AutoDrive config. Each vehicle
// element carries its destination as the 1-based index of a marker in the config's <mapmarker>.

use crate::xml::game::SchemaEra;
use crate::xml::tree::{self, XmlElement};
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// Marker index -> vehicle ids parked there, in document order.
pub type ParkingMap = BTreeMap<u32, Vec<u32>>;

pub const PARK_ATTRIBUTE: &str = "parkDestination";

fn destination_path(era: SchemaEra) -> &'static [&'static str] {
    match era {
        SchemaEra::Fs19 => &["FS19_AutoDrive", "AutoDriveVehicleData"],
        _ => &["AutoDrive"],
    }
}

fn descend<'a>(el: &'a XmlElement, path: &[&str]) -> Option<&'a XmlElement> {
    let mut cur = el;
    for name in path {
        cur = cur.child(name)?;
    }
    Some(cur)
}

fn descend_mut<'a>(el: &'a mut XmlElement, path: &[&str]) -> Option<&'a mut XmlElement> {
    let mut cur = el;
    for name in path {
        cur = cur.child_mut(name)?;
    }
    Some(cur)
}

fn collect_vehicles<'a>(el: &'a XmlElement, out: &mut Vec<&'a XmlElement>) {
    for child in el.elements() {
        if child.name == "vehicle" {
            out.push(child);
        }
        collect_vehicles(child, out);
    }
}

fn parse_number(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    raw.parse::<u32>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0 && *v <= u32::MAX as f64)
            .map(|v| v.trunc() as u32)
    })
}

pub fn parse_parking(text: &str, era: SchemaEra) -> Result<ParkingMap, roxmltree::Error> {
    let doc = tree::parse(text)?;
    let path = destination_path(era);
    let mut vehicles = Vec::new();
    collect_vehicles(&doc.root, &mut vehicles);

    let mut map = ParkingMap::new();
    let mut count = 0usize;
    for vehicle in vehicles {
        let raw = match descend(vehicle, path).and_then(|el| el.attr(PARK_ATTRIBUTE)) {
            Some(raw) => raw,
            None => continue,
        };
        let (id, marker) = match (vehicle.attr("id").and_then(parse_number), parse_number(raw)) {
            (Some(id), Some(marker)) if marker > 0 => (id, marker),
            _ => {
                warn!("ignoring park destination {:?} of vehicle {:?}", raw, vehicle.attr("id"));
                continue;
            }
        };
        debug!("vehicle {} parks at marker {}", id, marker);
        map.entry(marker).or_default().push(id);
        count += 1;
    }
    info!("loaded {} park destinations", count);
    Ok(map)
}

/// Rewrites `text` so that exactly the vehicles in `destinations` (vehicle id -> marker index)
/// carry a park destination.
pub fn update_parking(
    text: &str,
    era: SchemaEra,
    destinations: &BTreeMap<u32, u32>,
) -> Result<String, roxmltree::Error> {
    let mut doc = tree::parse(text)?;
    let path = destination_path(era);
    let mut updated = 0usize;
    doc.root.for_each_element_mut(&mut |el| {
        if el.name != "vehicle" {
            return;
        }
        let id = el.attr("id").and_then(parse_number);
        let target = match descend_mut(el, path) {
            Some(t) => t,
            None => return,
        };
        target.remove_attr(PARK_ATTRIBUTE);
        if let Some(marker) = id.and_then(|id| destinations.get(&id)) {
            target.set_attr(PARK_ATTRIBUTE, marker.to_string());
            updated += 1;
        }
    });
    if updated < destinations.len() {
        warn!(
            "{} parked vehicles have no matching entry in vehicles.xml",
            destinations.len() - updated
        );
    }
    info!("updated {} park destinations", updated);
    Ok(doc.to_xml_string())
}
