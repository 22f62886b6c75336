use crate::config::ConnectionParams;
use crate::types::{Column, ColumnData, Table};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use tokio_postgres::types::{FromSql, ToSql, Type};
use tokio_postgres::{Config as PgConfig, NoTls, Row};

pub struct QueryRunner {
    params: ConnectionParams,
}

impl QueryRunner {
    pub fn new(params: ConnectionParams) -> Self {
        Self { params }
    }

    /// Opens a connection, executes the statement and releases the
    /// connection on every exit path before returning.
    pub async fn run_query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Table> {
        let mut pg_cfg = PgConfig::new();
        pg_cfg
            .user(&self.params.user)
            .password(&self.params.password)
            .host(&self.params.host)
            .port(self.params.port)
            .dbname(&self.params.dbname);

        let (client, connection) = pg_cfg.connect(NoTls).await.map_err(Error::ConnectDb)?;

        let conn_handle = tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::debug!("database connection error:\n{}", e);
            }
        });

        let table = Self::execute(&client, sql, params).await;

        // dropping the client terminates the driver task, wait for it so
        // the socket is closed before we return
        std::mem::drop(client);
        let _ = conn_handle.await;

        table
    }

    async fn execute(
        client: &tokio_postgres::Client,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Table> {
        // prepare first so column names and types are known even when the
        // query matches no rows
        let statement = client.prepare(sql).await.map_err(Error::DbQuery)?;
        let rows = client
            .query(&statement, params)
            .await
            .map_err(Error::DbQuery)?;

        let mut columns = Vec::with_capacity(statement.columns().len());
        for (idx, column) in statement.columns().iter().enumerate() {
            columns.push(Column {
                name: column.name().to_owned(),
                data: column_data(&rows, idx, column.type_(), column.name())?,
            });
        }

        Ok(Table { columns })
    }
}

fn column_data(rows: &[Row], idx: usize, ty: &Type, name: &str) -> Result<ColumnData> {
    let data = if *ty == Type::BOOL {
        ColumnData::Boolean(collect(rows, idx)?)
    } else if *ty == Type::INT2 {
        let values = collect::<i16>(rows, idx)?;
        ColumnData::Int32(values.into_iter().map(|v| v.map(i32::from)).collect())
    } else if *ty == Type::INT4 {
        ColumnData::Int32(collect(rows, idx)?)
    } else if *ty == Type::INT8 {
        ColumnData::Int64(collect(rows, idx)?)
    } else if *ty == Type::FLOAT4 {
        let values = collect::<f32>(rows, idx)?;
        ColumnData::Float64(values.into_iter().map(|v| v.map(f64::from)).collect())
    } else if *ty == Type::FLOAT8 {
        ColumnData::Float64(collect(rows, idx)?)
    } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
    {
        ColumnData::Utf8(collect(rows, idx)?)
    } else if *ty == Type::DATE {
        ColumnData::Date(collect(rows, idx)?)
    } else if *ty == Type::TIMESTAMP {
        ColumnData::Timestamp(collect(rows, idx)?)
    } else if *ty == Type::TIMESTAMPTZ {
        let values = collect::<DateTime<Utc>>(rows, idx)?;
        ColumnData::Timestamp(values.into_iter().map(|v| v.map(|t| t.naive_utc())).collect())
    } else {
        return Err(Error::UnsupportedColumnType(name.to_owned(), ty.clone()));
    };

    Ok(data)
}

fn collect<'a, T: FromSql<'a>>(rows: &'a [Row], idx: usize) -> Result<Vec<Option<T>>> {
    rows.iter()
        .map(|row| row.try_get(idx).map_err(Error::DbQuery))
        .collect()
}
