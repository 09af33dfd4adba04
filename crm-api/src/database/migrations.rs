use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            external_id TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            image_url TEXT,
            role TEXT NOT NULL DEFAULT 'sales'
                CHECK (role IN ('owner', 'admin', 'manager', 'sales', 'viewer')),
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            notes TEXT,
            phone TEXT,
            company TEXT,
            title TEXT,
            lead_source TEXT,
            status TEXT NOT NULL DEFAULT 'new'
                CHECK (status IN ('new', 'contacted', 'qualified', 'unqualified')),
            rating TEXT NOT NULL DEFAULT 'cold' CHECK (rating IN ('hot', 'warm', 'cold')),
            owner TEXT NOT NULL,
            ai_score INTEGER CHECK (ai_score BETWEEN 0 AND 100),
            sentiment TEXT CHECK (sentiment IN ('positive', 'neutral', 'negative')),
            last_activity BIGINT,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS companies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            industry TEXT,
            website TEXT,
            phone TEXT,
            employees INTEGER,
            annual_revenue REAL,
            company_type TEXT NOT NULL
                CHECK (company_type IN ('customer', 'prospect', 'partner')),
            health_score INTEGER CHECK (health_score BETWEEN 0 AND 100),
            owner TEXT NOT NULL,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        )",
        [],
    )?;

    // competitors holds a JSON array of names
    conn.execute(
        "CREATE TABLE IF NOT EXISTS deals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            company_id INTEGER NOT NULL,
            contact_id INTEGER,
            stage TEXT NOT NULL CHECK (stage IN (
                'prospecting', 'qualification', 'proposal', 'negotiation',
                'closed-won', 'closed-lost')),
            amount REAL NOT NULL,
            probability INTEGER NOT NULL CHECK (probability BETWEEN 0 AND 100),
            ai_probability INTEGER CHECK (ai_probability BETWEEN 0 AND 100),
            close_date BIGINT NOT NULL,
            deal_type TEXT NOT NULL
                CHECK (deal_type IN ('new', 'renewal', 'expansion', 'upsell')),
            lead_source TEXT,
            owner TEXT NOT NULL,
            next_step TEXT,
            competitors TEXT NOT NULL DEFAULT '[]',
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        )",
        [],
    )?;

    // related_to / related_id are checked by the application, not by foreign keys
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            subject TEXT NOT NULL,
            description TEXT,
            due_date BIGINT NOT NULL,
            priority TEXT NOT NULL CHECK (priority IN ('high', 'medium', 'low')),
            status TEXT NOT NULL DEFAULT 'not-started'
                CHECK (status IN ('not-started', 'in-progress', 'completed', 'deferred')),
            assigned_to TEXT NOT NULL,
            related_to TEXT CHECK (related_to IN ('contact', 'company', 'deal')),
            related_id INTEGER,
            ai_suggested INTEGER NOT NULL DEFAULT 0,
            completed_at BIGINT,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS activities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            activity_type TEXT NOT NULL
                CHECK (activity_type IN ('call', 'email', 'meeting', 'note')),
            subject TEXT NOT NULL,
            description TEXT,
            duration INTEGER,
            outcome TEXT,
            related_to TEXT NOT NULL CHECK (related_to IN ('contact', 'company', 'deal')),
            related_id INTEGER NOT NULL,
            owner TEXT NOT NULL,
            ai_summary TEXT,
            sentiment TEXT,
            created_at BIGINT NOT NULL
        )",
        [],
    )?;

    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
         CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);

         CREATE INDEX IF NOT EXISTS idx_contacts_owner ON contacts(owner);
         CREATE INDEX IF NOT EXISTS idx_contacts_status ON contacts(status);
         CREATE INDEX IF NOT EXISTS idx_contacts_company ON contacts(company);

         CREATE INDEX IF NOT EXISTS idx_companies_owner ON companies(owner);
         CREATE INDEX IF NOT EXISTS idx_companies_type ON companies(company_type);

         CREATE INDEX IF NOT EXISTS idx_deals_company ON deals(company_id);
         CREATE INDEX IF NOT EXISTS idx_deals_contact ON deals(contact_id);
         CREATE INDEX IF NOT EXISTS idx_deals_owner ON deals(owner);
         CREATE INDEX IF NOT EXISTS idx_deals_stage ON deals(stage);
         CREATE INDEX IF NOT EXISTS idx_deals_close_date ON deals(close_date);

         CREATE INDEX IF NOT EXISTS idx_tasks_assigned_to ON tasks(assigned_to);
         CREATE INDEX IF NOT EXISTS idx_tasks_due_date ON tasks(due_date);
         CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
         CREATE INDEX IF NOT EXISTS idx_tasks_related ON tasks(related_to, related_id);

         CREATE INDEX IF NOT EXISTS idx_activities_related
            ON activities(related_to, related_id, created_at);
         CREATE INDEX IF NOT EXISTS idx_activities_owner ON activities(owner);
         CREATE INDEX IF NOT EXISTS idx_activities_type ON activities(activity_type);",
    )?;

    Ok(())
}
