use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(InstanceStatus {
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

// Overdue is never stored; see `timeline::derive_status`.
str_enum!(OccurrenceStatus {
    Pending => "pending",
    Completed => "completed",
    Skipped => "skipped",
    Cancelled => "cancelled",
});

str_enum!(OccurrenceOrigin {
    Scheduled => "scheduled",
    OnDemand => "on_demand",
});

str_enum!(IntervalUnit {
    Hours => "hours",
    Days => "days",
});

str_enum!(PatientActionKind {
    None => "none",
    MarkDone => "mark_done",
    RecordVideo => "record_video",
    UploadPhoto => "upload_photo",
    RecordValue => "record_value",
    FreeText => "free_text",
});

str_enum!(DoctorActionKind {
    None => "none",
    Review => "review",
    Approve => "approve",
    Call => "call",
    AdjustDose => "adjust_dose",
});

str_enum!(TimelineOrder {
    Chronological => "chronological",
    MostRecentFirst => "most_recent_first",
});

impl InstanceStatus {
    /// Completed and cancelled instances accept no further edits.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl OccurrenceStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}
