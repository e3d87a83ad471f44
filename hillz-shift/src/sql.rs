//! SQL query constants for the event store.

pub const INSERT_REGISTRATION: &str = r#"
    INSERT INTO registrations
        (id, name, email, phone, address, who_invited, heard_from, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;

pub const SELECT_ALL_REGISTRATIONS: &str = r#"
    SELECT id, name, email, phone, address, who_invited, heard_from, created_at
    FROM registrations
    ORDER BY created_at DESC
"#;

pub const SELECT_PARTICIPANTS: &str =
    "SELECT id, name, email, phone FROM registrations ORDER BY created_at DESC";

pub const SELECT_REGISTRATION_TIMES_SINCE: &str =
    "SELECT created_at FROM registrations WHERE created_at >= ?";

pub const INSERT_INVITATION: &str = r#"
    INSERT INTO invitations
        (id, inviter_name, invitee_name, invitee_phone, invitee_email,
         location, custom_message, status, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

pub const SELECT_ALL_INVITATIONS: &str = r#"
    SELECT id, inviter_name, invitee_name, invitee_phone, invitee_email,
           location, custom_message, status, created_at
    FROM invitations
    ORDER BY created_at DESC
"#;

pub const SELECT_INVITATION_TIMES_SINCE: &str =
    "SELECT created_at FROM invitations WHERE created_at >= ?";
