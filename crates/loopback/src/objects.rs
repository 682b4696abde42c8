//! Objects the host refers to by handle: networks and report collectors.

use std::{
    ffi::c_void,
    sync::{
        Arc, LazyLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::{EngineError, Result};

pub const TYPE_BUS: i32 = 0;
pub const TYPE_LINE: i32 = 1;
pub const TYPE_TWO_WINDINGS_TRANSFORMER: i32 = 2;
pub const TYPE_GENERATOR: i32 = 4;
pub const TYPE_LOAD: i32 = 5;
pub const TYPE_DANGLING_LINE: i32 = 10;
pub const TYPE_VOLTAGE_LEVEL: i32 = 15;
pub const TYPE_SUBSTATION: i32 = 16;

const TYPE_NAMES: &[(i32, &str)] = &[
    (TYPE_BUS, "BUS"),
    (TYPE_LINE, "LINE"),
    (TYPE_TWO_WINDINGS_TRANSFORMER, "TWO_WINDINGS_TRANSFORMER"),
    (TYPE_GENERATOR, "GENERATOR"),
    (TYPE_LOAD, "LOAD"),
    (TYPE_DANGLING_LINE, "DANGLING_LINE"),
    (TYPE_VOLTAGE_LEVEL, "VOLTAGE_LEVEL"),
    (TYPE_SUBSTATION, "SUBSTATION"),
];

fn type_name(element_type: i32) -> &'static str {
    TYPE_NAMES
        .iter()
        .find(|(t, _)| *t == element_type)
        .map_or("UNKNOWN", |(_, name)| name)
}

fn type_from_name(name: &str) -> Option<i32> {
    TYPE_NAMES.iter().find(|(_, n)| *n == name).map(|(t, _)| *t)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: String,
    pub element_type: i32,
    pub voltage_level: String,
    pub nominal_v: f64,
    pub country: String,
    /// Index of the connected component holding the element.
    pub component: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    pub id: String,
    pub name: String,
    pub source_format: String,
    pub case_date: f64,
    pub forecast_distance: i32,
    pub elements: Vec<Element>,
}

/// Serialization format of the loopback engine: one line per record.
pub const FORMAT: &str = "LOOPBACK";
pub const FILE_EXTENSION: &str = ".lnet";

const CASE_DATE: f64 = 1_388_534_400.0;

fn element(
    id: &str,
    element_type: i32,
    voltage_level: &str,
    nominal_v: f64,
    country: &str,
) -> Element {
    Element {
        id: id.to_string(),
        element_type,
        voltage_level: voltage_level.to_string(),
        nominal_v,
        country: country.to_string(),
        component: 0,
    }
}

impl Network {
    fn new(id: &str, source_format: &str, elements: Vec<Element>) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            source_format: source_format.to_string(),
            case_date: CASE_DATE,
            forecast_distance: 0,
            elements,
        }
    }

    /// Builds a network from a named factory.
    pub fn from_factory(factory: &str, id: &str) -> Result<Self> {
        let elements = match factory {
            "empty" => Vec::new(),
            "four_substations" => four_substations(),
            "ieee14" => ieee14(),
            "eurostag_tutorial_example1" => eurostag_tutorial(),
            _ => return Err(EngineError::UnknownFactory(factory.to_string())),
        };
        let id = if id.is_empty() { factory } else { id };
        Ok(Self::new(id, "code", elements))
    }

    pub fn into_shared(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }

    pub fn component_count(&self) -> u32 {
        self.elements
            .iter()
            .map(|element| element.component + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn buses(&self) -> impl Iterator<Item = &Element> {
        self.elements
            .iter()
            .filter(|element| element.element_type == TYPE_BUS)
    }

    pub fn serialize(&self) -> String {
        let mut out = format!("network\t{}\t{}\n", self.id, self.name);
        for element in &self.elements {
            out.push_str(&format!(
                "element\t{}\t{}\t{}\t{}\t{}\t{}\n",
                type_name(element.element_type),
                element.id,
                element.voltage_level,
                element.nominal_v,
                element.country,
                element.component,
            ));
        }
        out
    }

    pub fn parse(file_name: &str, content: &str) -> Result<Self> {
        let invalid = || EngineError::UnsupportedFormat(file_name.to_string());
        if !file_name.ends_with(FILE_EXTENSION) {
            return Err(invalid());
        }
        let mut lines = content.lines().filter(|line| !line.trim().is_empty());
        let header: Vec<&str> = lines.next().ok_or_else(invalid)?.split('\t').collect();
        let (id, name) = match header.as_slice() {
            ["network", id, name] => (*id, *name),
            ["network", id] => (*id, *id),
            _ => return Err(invalid()),
        };
        let mut network = Self::new(id, FORMAT, Vec::new());
        network.name = name.to_string();
        for line in lines {
            let fields: Vec<&str> = line.split('\t').collect();
            let ["element", kind, id, vl, nominal_v, country, component] = fields.as_slice() else {
                return Err(invalid());
            };
            network.elements.push(Element {
                id: (*id).to_string(),
                element_type: type_from_name(kind).ok_or_else(invalid)?,
                voltage_level: (*vl).to_string(),
                nominal_v: nominal_v.parse().map_err(|_| invalid())?,
                country: (*country).to_string(),
                component: component.parse().map_err(|_| invalid())?,
            });
        }
        Ok(network)
    }

    /// Concatenates `networks` into a new network, renumbering components so
    /// they stay distinct.
    pub fn merged(networks: &[Self]) -> Result<Self> {
        let Some(first) = networks.first() else {
            return Err(EngineError::InvalidArgument(
                "At least one network is required to merge".to_string(),
            ));
        };
        let id = networks
            .iter()
            .map(|network| network.id.as_str())
            .collect::<Vec<_>>()
            .join("+");
        let mut merged = Self::new(&id, &first.source_format, Vec::new());
        for network in networks {
            let offset = merged.component_count();
            merged
                .elements
                .extend(network.elements.iter().map(|element| Element {
                    component: element.component + offset,
                    ..element.clone()
                }));
        }
        Ok(merged)
    }
}

fn four_substations() -> Vec<Element> {
    vec![
        element("S1", TYPE_SUBSTATION, "", 0.0, "FR"),
        element("S2", TYPE_SUBSTATION, "", 0.0, "FR"),
        element("S3", TYPE_SUBSTATION, "", 0.0, "BE"),
        element("S4", TYPE_SUBSTATION, "", 0.0, "DE"),
        element("S1VL1", TYPE_VOLTAGE_LEVEL, "S1VL1", 225.0, "FR"),
        element("S1VL2", TYPE_VOLTAGE_LEVEL, "S1VL2", 400.0, "FR"),
        element("S2VL1", TYPE_VOLTAGE_LEVEL, "S2VL1", 400.0, "FR"),
        element("S3VL1", TYPE_VOLTAGE_LEVEL, "S3VL1", 400.0, "BE"),
        element("S4VL1", TYPE_VOLTAGE_LEVEL, "S4VL1", 400.0, "DE"),
        element("S1VL1_0", TYPE_BUS, "S1VL1", 225.0, "FR"),
        element("S1VL2_0", TYPE_BUS, "S1VL2", 400.0, "FR"),
        element("S2VL1_0", TYPE_BUS, "S2VL1", 400.0, "FR"),
        element("S3VL1_0", TYPE_BUS, "S3VL1", 400.0, "BE"),
        element("S4VL1_0", TYPE_BUS, "S4VL1", 400.0, "DE"),
        element("GH1", TYPE_GENERATOR, "S1VL2", 400.0, "FR"),
        element("GH2", TYPE_GENERATOR, "S1VL2", 400.0, "FR"),
        element("GTH1", TYPE_GENERATOR, "S2VL1", 400.0, "FR"),
        element("GTH2", TYPE_GENERATOR, "S3VL1", 400.0, "BE"),
        element("LD1", TYPE_LOAD, "S1VL1", 225.0, "FR"),
        element("LD2", TYPE_LOAD, "S3VL1", 400.0, "BE"),
        element("LD6", TYPE_LOAD, "S4VL1", 400.0, "DE"),
        element("TWT", TYPE_TWO_WINDINGS_TRANSFORMER, "S1VL1", 225.0, "FR"),
        element("LINE_S2S3", TYPE_LINE, "S2VL1", 400.0, "FR"),
        element("LINE_S3S4", TYPE_LINE, "S3VL1", 400.0, "BE"),
    ]
}

fn ieee14() -> Vec<Element> {
    const GENERATORS: &[usize] = &[1, 2, 3, 6, 8];
    const LOADS: &[usize] = &[2, 3, 4, 5, 6, 9, 10, 11, 12, 13, 14];
    const LINES: &[(usize, usize)] = &[
        (1, 2),
        (1, 5),
        (2, 3),
        (2, 4),
        (2, 5),
        (3, 4),
        (4, 5),
        (6, 11),
        (6, 12),
        (6, 13),
        (7, 8),
        (7, 9),
        (9, 10),
        (9, 14),
        (10, 11),
        (12, 13),
        (13, 14),
    ];
    const TRANSFORMERS: &[(usize, usize)] = &[(4, 7), (4, 9), (5, 6)];
    let nominal_v = |bus: usize| if bus <= 5 { 135.0 } else { 14.0 };

    let mut elements = Vec::new();
    for bus in 1..=14 {
        let vl = format!("VL{bus}");
        elements.push(element(&vl, TYPE_VOLTAGE_LEVEL, &vl, nominal_v(bus), ""));
        elements.push(element(&format!("B{bus}"), TYPE_BUS, &vl, nominal_v(bus), ""));
    }
    for &bus in GENERATORS {
        elements.push(element(&format!("B{bus}-G"), TYPE_GENERATOR, &format!("VL{bus}"), nominal_v(bus), ""));
    }
    for &bus in LOADS {
        elements.push(element(&format!("B{bus}-L"), TYPE_LOAD, &format!("VL{bus}"), nominal_v(bus), ""));
    }
    for &(from, to) in LINES {
        elements.push(element(&format!("L{from}-{to}-1"), TYPE_LINE, &format!("VL{from}"), nominal_v(from), ""));
    }
    for &(from, to) in TRANSFORMERS {
        elements.push(element(&format!("T{from}-{to}-1"), TYPE_TWO_WINDINGS_TRANSFORMER, &format!("VL{from}"), nominal_v(from), ""));
    }
    elements
}

fn eurostag_tutorial() -> Vec<Element> {
    vec![
        element("P1", TYPE_SUBSTATION, "", 0.0, "FR"),
        element("P2", TYPE_SUBSTATION, "", 0.0, "BE"),
        element("VLGEN", TYPE_VOLTAGE_LEVEL, "VLGEN", 24.0, "FR"),
        element("VLHV1", TYPE_VOLTAGE_LEVEL, "VLHV1", 380.0, "FR"),
        element("VLHV2", TYPE_VOLTAGE_LEVEL, "VLHV2", 380.0, "BE"),
        element("VLLOAD", TYPE_VOLTAGE_LEVEL, "VLLOAD", 150.0, "BE"),
        element("VLGEN_0", TYPE_BUS, "VLGEN", 24.0, "FR"),
        element("VLHV1_0", TYPE_BUS, "VLHV1", 380.0, "FR"),
        element("VLHV2_0", TYPE_BUS, "VLHV2", 380.0, "BE"),
        element("VLLOAD_0", TYPE_BUS, "VLLOAD", 150.0, "BE"),
        element("GEN", TYPE_GENERATOR, "VLGEN", 24.0, "FR"),
        element("LOAD", TYPE_LOAD, "VLLOAD", 150.0, "BE"),
        element("NGEN_NHV1", TYPE_TWO_WINDINGS_TRANSFORMER, "VLGEN", 24.0, "FR"),
        element("NHV2_NLOAD", TYPE_TWO_WINDINGS_TRANSFORMER, "VLHV2", 380.0, "BE"),
        element("NHV1_NHV2_1", TYPE_LINE, "VLHV1", 380.0, "FR"),
        element("NHV1_NHV2_2", TYPE_LINE, "VLHV1", 380.0, "FR"),
    ]
}

/// Messages collected while the host passes this reporter to engine calls.
#[derive(Debug, Default)]
pub struct Reporter {
    pub task_key: String,
    pub default_name: String,
    pub messages: Vec<String>,
}

impl Reporter {
    pub fn into_shared(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }

    pub fn report(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn print(&self) -> String {
        let mut out = format!("+ {}\n", self.default_name);
        for message in &self.messages {
            out.push_str("   ");
            out.push_str(message);
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone)]
pub enum Object {
    Network(Arc<Mutex<Network>>),
    Reporter(Arc<Mutex<Reporter>>),
}

static NEXT_HANDLE: AtomicUsize = AtomicUsize::new(1);
static OBJECTS: LazyLock<DashMap<usize, Object>> = LazyLock::new(DashMap::new);
static DESTROYED: LazyLock<DashMap<usize, u32>> = LazyLock::new(DashMap::new);

/// Registers `object` under a fresh handle. Handles are never reused.
pub fn register(object: Object) -> *mut c_void {
    let id = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
    OBJECTS.insert(id, object);
    std::ptr::without_provenance_mut(id)
}

pub fn lookup(handle: *mut c_void) -> Result<Object> {
    OBJECTS
        .get(&handle.addr())
        .map(|object| object.clone())
        .ok_or(EngineError::UnknownHandle(handle.addr()))
}

pub fn network(handle: *mut c_void) -> Result<Arc<Mutex<Network>>> {
    match lookup(handle)? {
        Object::Network(network) => Ok(network),
        Object::Reporter(_) => Err(EngineError::WrongHandle {
            handle: handle.addr(),
            expected: "network",
        }),
    }
}

/// Reporter behind an optional handle; null means no reporting.
pub fn reporter(handle: *mut c_void) -> Result<Option<Arc<Mutex<Reporter>>>> {
    if handle.is_null() {
        return Ok(None);
    }
    match lookup(handle)? {
        Object::Reporter(reporter) => Ok(Some(reporter)),
        Object::Network(_) => Err(EngineError::WrongHandle {
            handle: handle.addr(),
            expected: "reporter",
        }),
    }
}

pub fn destroy(handle: *mut c_void) -> Result<()> {
    let id = handle.addr();
    OBJECTS
        .remove(&id)
        .ok_or(EngineError::UnknownHandle(id))?;
    *DESTROYED.entry(id).or_insert(0) += 1;
    Ok(())
}

pub fn is_live(handle: *mut c_void) -> bool {
    OBJECTS.contains_key(&handle.addr())
}

pub fn destroy_count(handle: *mut c_void) -> u32 {
    DESTROYED.get(&handle.addr()).map_or(0, |count| *count)
}
