use super::macros::define_type;

// Attributes are kept off the entries: after a separator the macro cannot tell a record entry's
// attribute from a question-only entry's attribute.
define_type! {
    pub [Type, QType, Unknown]:
    A => 1,
    NS => 2,
    CNAME => 5,
    SOA => 6,
    PTR => 12,
    MX => 15,
    TXT => 16,
    AAAA => 28,
    [AXFR => 252],
    [MAILB => 253],
    [MAILA => 254],
    [ALL => 255],
}

define_type! {
    pub [Class, QClass, Unknown]:
    IN => 1,
    CS => 2,
    CH => 3,
    HS => 4,
    [ANY => 255],
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_codes_map_to_variants() {
        assert_eq!(Type::from(1), Type::A);
        assert_eq!(QType::from(255), QType::ALL);
        assert_eq!(QClass::from(1), QClass::IN);
        assert_eq!(QClass::from(Class::HS), QClass::HS);
    }

    #[test]
    fn unknown_codes_keep_their_value() {
        assert_eq!(Type::from(255), Type::Unknown(255));
        assert_eq!(QType::from(65), QType::Unknown(65));
        assert_eq!(QType::from(65).as_u16(), 65);
        assert_eq!(Class::from(254).as_u16(), 254);
    }
}
