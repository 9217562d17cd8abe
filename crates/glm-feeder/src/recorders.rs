//! Measurement recorders and collectors.

use std::fmt;
use std::str::FromStr;

use glm_core::{GlmError, GlmResult, GlmTree, Leaf, LeafId, LeafKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const LOSS_PROPERTIES: &str = "sum(power_losses_A.real),sum(power_losses_A.imag),\
sum(power_losses_B.real),sum(power_losses_B.imag),\
sum(power_losses_C.real),sum(power_losses_C.imag)";

/// Group id given to links that touch a swing bus.
pub const SWING_GROUP: &str = "swingKids";

/// Recorder templates known to [`attach_recorders`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecorderKind {
    Regulator,
    Voltage,
    Capacitor,
    Climate,
    Inverter,
    Windmill,
    CollectorVoltage,
    OverheadLosses,
    UndergroundLosses,
    TriplexLosses,
    TransformerLosses,
}

impl RecorderKind {
    pub const ALL: [RecorderKind; 11] = [
        RecorderKind::Regulator,
        RecorderKind::Voltage,
        RecorderKind::Capacitor,
        RecorderKind::Climate,
        RecorderKind::Inverter,
        RecorderKind::Windmill,
        RecorderKind::CollectorVoltage,
        RecorderKind::OverheadLosses,
        RecorderKind::UndergroundLosses,
        RecorderKind::TriplexLosses,
        RecorderKind::TransformerLosses,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RecorderKind::Regulator => "Regulator",
            RecorderKind::Voltage => "Voltage",
            RecorderKind::Capacitor => "Capacitor",
            RecorderKind::Climate => "Climate",
            RecorderKind::Inverter => "Inverter",
            RecorderKind::Windmill => "Windmill",
            RecorderKind::CollectorVoltage => "CollectorVoltage",
            RecorderKind::OverheadLosses => "OverheadLosses",
            RecorderKind::UndergroundLosses => "UndergroundLosses",
            RecorderKind::TriplexLosses => "TriplexLosses",
            RecorderKind::TransformerLosses => "TransformerLosses",
        }
    }

    /// Collectors aggregate over a `group` and take no parent.
    pub fn is_collector(self) -> bool {
        self.group_class().is_some()
    }

    /// Class named in a collector's `group class=...` filter.
    pub fn group_class(self) -> Option<&'static str> {
        match self {
            RecorderKind::CollectorVoltage => Some("triplex_meter"),
            RecorderKind::OverheadLosses => Some("overhead_line"),
            RecorderKind::UndergroundLosses => Some("underground_line"),
            RecorderKind::TriplexLosses => Some("triplex_line"),
            RecorderKind::TransformerLosses => Some("transformer"),
            _ => None,
        }
    }

    fn property(self) -> &'static str {
        match self {
            RecorderKind::Regulator => {
                "tap_A,tap_B,tap_C,power_in_A.real,power_in_A.imag,power_in_B.real,\
power_in_B.imag,power_in_C.real,power_in_C.imag,power_in.real,power_in.imag,phases"
            }
            RecorderKind::Voltage => {
                "voltage_1.real,voltage_1.imag,voltage_2.real,voltage_2.imag,\
voltage_12.real,voltage_12.imag"
            }
            RecorderKind::Capacitor => "switchA,switchB,switchC,phases",
            RecorderKind::Climate => {
                "temperature,solar_direct,wind_speed,rainfall,snowdepth,solar_global"
            }
            RecorderKind::Inverter => {
                "power_A.real,power_A.imag,power_B.real,power_B.imag,power_C.real,power_C.imag"
            }
            RecorderKind::Windmill => {
                "voltage_A.real,voltage_A.imag,voltage_B.real,voltage_B.imag,\
voltage_C.real,voltage_C.imag,current_A.real,current_A.imag,current_B.real,\
current_B.imag,current_C.real,current_C.imag"
            }
            RecorderKind::CollectorVoltage => {
                "min(voltage_12.mag),mean(voltage_12.mag),max(voltage_12.mag),std(voltage_12.mag)"
            }
            RecorderKind::OverheadLosses
            | RecorderKind::UndergroundLosses
            | RecorderKind::TriplexLosses
            | RecorderKind::TransformerLosses => LOSS_PROPERTIES,
        }
    }

    fn collector_file(self) -> String {
        match self {
            RecorderKind::CollectorVoltage => "VoltageJiggle.csv".to_string(),
            other => format!("{}.csv", other.name()),
        }
    }
}

impl fmt::Display for RecorderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RecorderKind {
    type Err = GlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecorderKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<&str> = RecorderKind::ALL.iter().map(|k| k.name()).collect();
                GlmError::InvalidArgument(format!(
                    "unknown recorder kind '{s}' (expected one of {})",
                    known.join(", ")
                ))
            })
    }
}

fn object(class: &str) -> LeafKind {
    LeafKind::Object {
        class: class.to_string(),
    }
}

/// Attach recorders of `kind` to the model and return the new ids.
///
/// Collectors are added once, and only if some top-level object of the class
/// they aggregate exists. Parented recorders are added one per top-level
/// named leaf whose `key` attribute equals `value` (use `key = "object"` to
/// match on class), with `file` set to `<Kind>_<name>.csv`.
pub fn attach_recorders(
    tree: &mut GlmTree,
    kind: RecorderKind,
    key: &str,
    value: &str,
) -> Vec<LeafId> {
    let mut added = Vec::new();

    if let Some(group) = kind.group_class() {
        if tree.leaves().iter().any(|leaf| leaf.is_object(group)) {
            added.push(tree.push(
                object("collector"),
                [
                    ("interval", "1".to_string()),
                    ("limit", "0".to_string()),
                    ("file", kind.collector_file()),
                    ("group", format!("class={group}")),
                    ("property", kind.property().to_string()),
                ],
            ));
        }
    } else {
        let targets: Vec<String> = tree
            .leaves()
            .iter()
            .filter(|leaf| leaf.field(key) == Some(value))
            .filter_map(|leaf| leaf.name().map(str::to_string))
            .collect();
        for name in targets {
            let file = format!("{}_{name}.csv", kind.name());
            added.push(tree.push(
                object("recorder"),
                [
                    ("interval", "1".to_string()),
                    ("parent", name),
                    ("limit", "0".to_string()),
                    ("file", file),
                    ("property", kind.property().to_string()),
                ],
            ));
        }
    }

    info!(kind = kind.name(), added = added.len(), "attached recorders");
    added
}

/// [`attach_recorders`] with the kind given by name.
pub fn attach_named(
    tree: &mut GlmTree,
    kind: &str,
    key: &str,
    value: &str,
) -> GlmResult<Vec<LeafId>> {
    Ok(attach_recorders(tree, kind.parse()?, key, value))
}

/// Tag every link touching a swing bus with `groupid swingKids` and add one
/// power-in collector per distinct link class. Returns the collector ids.
pub fn group_swing_kids(tree: &mut GlmTree) -> Vec<LeafId> {
    let swing: Vec<String> = tree
        .leaves()
        .iter()
        .filter(|leaf| leaf.attr("bustype") == Some("SWING"))
        .filter_map(|leaf| leaf.name().map(str::to_string))
        .collect();

    let touches_swing = |leaf: &Leaf| {
        let (Some(from), Some(to)) = (leaf.attr("from"), leaf.attr("to")) else {
            return false;
        };
        swing.iter().any(|name| name == from || name == to)
    };

    let mut classes: Vec<String> = Vec::new();
    for leaf in tree.leaves_mut() {
        if !touches_swing(&*leaf) {
            continue;
        }
        leaf.set_attr("groupid", SWING_GROUP);
        if let Some(class) = leaf.class() {
            if !classes.iter().any(|seen| seen == class) {
                classes.push(class.to_string());
            }
        }
        debug!(id = %leaf.id(), "swing kid");
    }

    let collectors: Vec<LeafId> = classes
        .iter()
        .map(|class| {
            tree.push(
                object("collector"),
                [
                    ("interval", "1".to_string()),
                    ("limit", "0".to_string()),
                    ("group", format!("class={class} AND groupid={SWING_GROUP}")),
                    ("file", format!("SwingKids_{class}.csv")),
                    ("property", "sum(power_in.real),sum(power_in.imag)".to_string()),
                ],
            )
        })
        .collect();
    info!(swing = swing.len(), collectors = collectors.len(), "grouped swing kids");
    collectors
}
