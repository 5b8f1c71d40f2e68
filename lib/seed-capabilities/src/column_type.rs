use once_cell::sync::Lazy;
use regex::Regex;

/// Semantic category of a declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    SmallInt,
    Integer,
    BigInt,
    SmallSerial,
    Serial,
    BigSerial,
    Decimal,
    Real,
    Double,
    Boolean,
    Text,
    Varchar,
    Char,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Json,
    Jsonb,
    Uuid,
    Bytea,
}

static PARAMETERIZED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(VARCHAR|CHARACTER VARYING|CHAR|CHARACTER|NUMERIC|DECIMAL|TIMESTAMP|TIME|FLOAT)\s*\(\s*\d+\s*(?:,\s*\d+\s*)?\)(.*)$")
        .expect("parameterized type pattern is valid")
});

impl ColumnType {
    /// Parse a declared SQL type, case-insensitively.
    ///
    /// Accepts the spellings used in hand-written schemas (`SERIAL`,
    /// `VARCHAR(255)`, `NUMERIC(10,2)`) as well as the long forms reported by
    /// `information_schema` (`character varying`, `timestamp without time zone`).
    pub fn parse(declared: &str) -> Option<ColumnType> {
        let upper = declared.trim().to_uppercase();
        let collapsed = upper.split_whitespace().collect::<Vec<_>>().join(" ");

        let base = match PARAMETERIZED.captures(&collapsed) {
            Some(caps) => format!("{}{}", &caps[1], &caps[2]),
            None => collapsed,
        };

        let ty = match base.trim() {
            "SMALLINT" | "INT2" => ColumnType::SmallInt,
            "INTEGER" | "INT" | "INT4" => ColumnType::Integer,
            "BIGINT" | "INT8" => ColumnType::BigInt,
            "SMALLSERIAL" | "SERIAL2" => ColumnType::SmallSerial,
            "SERIAL" | "SERIAL4" => ColumnType::Serial,
            "BIGSERIAL" | "SERIAL8" => ColumnType::BigSerial,
            "DECIMAL" | "NUMERIC" => ColumnType::Decimal,
            "REAL" | "FLOAT4" => ColumnType::Real,
            "FLOAT" | "FLOAT8" | "DOUBLE PRECISION" => ColumnType::Double,
            "BOOLEAN" | "BOOL" => ColumnType::Boolean,
            "TEXT" => ColumnType::Text,
            "VARCHAR" | "CHARACTER VARYING" => ColumnType::Varchar,
            "CHAR" | "CHARACTER" | "BPCHAR" => ColumnType::Char,
            "DATE" => ColumnType::Date,
            "TIME" | "TIME WITHOUT TIME ZONE" | "TIME WITH TIME ZONE" | "TIMETZ" => {
                ColumnType::Time
            }
            "TIMESTAMP" | "TIMESTAMP WITHOUT TIME ZONE" => ColumnType::Timestamp,
            "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" => ColumnType::TimestampTz,
            "JSON" => ColumnType::Json,
            "JSONB" => ColumnType::Jsonb,
            "UUID" => ColumnType::Uuid,
            "BYTEA" => ColumnType::Bytea,
            _ => return None,
        };

        Some(ty)
    }

    pub fn is_serial(self) -> bool {
        matches!(
            self,
            ColumnType::SmallSerial | ColumnType::Serial | ColumnType::BigSerial
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt
        ) || self.is_serial()
    }

    /// Types whose literals are written without quotes.
    pub fn is_numeric(self) -> bool {
        self.is_integer()
            || matches!(
                self,
                ColumnType::Decimal | ColumnType::Real | ColumnType::Double
            )
    }

    pub fn is_boolean(self) -> bool {
        self == ColumnType::Boolean
    }

    /// SQL spelling used when rendering DDL.
    pub fn sql_name(self) -> &'static str {
        match self {
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::SmallSerial => "SMALLSERIAL",
            ColumnType::Serial => "SERIAL",
            ColumnType::BigSerial => "BIGSERIAL",
            ColumnType::Decimal => "NUMERIC",
            ColumnType::Real => "REAL",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Text => "TEXT",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Char => "CHAR",
            ColumnType::Date => "DATE",
            ColumnType::Time => "TIME",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::TimestampTz => "TIMESTAMPTZ",
            ColumnType::Json => "JSON",
            ColumnType::Jsonb => "JSONB",
            ColumnType::Uuid => "UUID",
            ColumnType::Bytea => "BYTEA",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_parameterized_types() {
        assert_eq!(ColumnType::parse("serial"), Some(ColumnType::Serial));
        assert_eq!(ColumnType::parse("VARCHAR(255)"), Some(ColumnType::Varchar));
        assert_eq!(ColumnType::parse("numeric(10, 2)"), Some(ColumnType::Decimal));
        assert_eq!(ColumnType::parse("DECIMAL(8)"), Some(ColumnType::Decimal));
        assert_eq!(ColumnType::parse("character varying"), Some(ColumnType::Varchar));
        assert_eq!(
            ColumnType::parse("timestamp  with time zone"),
            Some(ColumnType::TimestampTz)
        );
        assert_eq!(
            ColumnType::parse("TIMESTAMP(3) WITHOUT TIME ZONE"),
            Some(ColumnType::Timestamp)
        );
        assert_eq!(ColumnType::parse("double precision"), Some(ColumnType::Double));
    }

    #[test]
    fn rejects_unknown_types() {
        assert_eq!(ColumnType::parse("MONEYBAGS"), None);
        assert_eq!(ColumnType::parse("VARCHAR(abc)"), None);
        assert_eq!(ColumnType::parse(""), None);
    }

    #[test]
    fn numeric_categories() {
        assert!(ColumnType::Serial.is_integer());
        assert!(ColumnType::Decimal.is_numeric());
        assert!(!ColumnType::Uuid.is_numeric());
        assert!(ColumnType::Boolean.is_boolean());
    }
}
