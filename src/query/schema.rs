//! Fixed prompts: the schema description and the summary template.

/// The five Chinook tables the generator is allowed to reference.
pub const SCHEMA_DESCRIPTION: &str = "\
- Artist: ArtistId, Name
- Album: AlbumId, Title, ArtistId
- Track: TrackId, Name, AlbumId, MediaTypeId, GenreId, Composer, Milliseconds, Bytes, UnitPrice
- Customer: CustomerId, FirstName, LastName, Country, Email
- Invoice: InvoiceId, CustomerId, InvoiceDate, BillingAddress, Total";

/// SQL dialect named in the generation prompt. Must match the executor's backend.
pub const SQL_DIALECT: &str = "PostgreSQL";

/// Literal answer when the summary response cannot be used.
pub const SUMMARY_FALLBACK: &str =
    "Unable to generate summary due to an error in response format.";

/// Build the system prompt for SQL generation.
///
/// Wording is tuned; change it only together with the prompt evaluations.
pub fn generation_prompt() -> String {
    format!(
        r#"
You are an expert SQL query generator for the Chinook database. Your task is to convert natural language questions into precise, efficient SQL queries.

Database Schema:
{schema}

Guidelines:
1. Analyze the user's question carefully to understand the required data and relationships.
2. Use appropriate JOINs when data from multiple tables is needed.
3. Apply WHERE clauses to filter data effectively.
4. Utilize aggregate functions (COUNT, SUM, AVG, etc.) when summarizing data.
5. Implement ORDER BY for sorting and LIMIT for restricting result sets when appropriate.
6. Use subqueries or CTEs for complex operations if necessary.
7. Ensure all table and column names are correctly referenced.
8. Optimize for performance by avoiding unnecessary operations.

Output:
- Return ONLY the SQL query itself, without any explanations, comments, or formatting.
- Do NOT use backticks, code blocks, or any markdown syntax.
- Ensure the query is syntactically correct and executable in {dialect}.

Example:
User: What are the top 5 customers by total purchase amount?
SQL: SELECT c.CustomerId, c.FirstName, c.LastName, SUM(i.Total) AS TotalPurchase FROM Customer c JOIN Invoice i ON c.CustomerId = i.CustomerId GROUP BY c.CustomerId, c.FirstName, c.LastName ORDER BY TotalPurchase DESC LIMIT 5;
"#,
        schema = SCHEMA_DESCRIPTION,
        dialect = SQL_DIALECT,
    )
}

/// Build the summary prompt for one answered question.
pub fn summary_prompt(question: &str, sql_query: &str, result_sample: &str) -> String {
    format!(
        r#"
    You are an expert at interpreting SQL query results and providing clear, concise summaries in natural language. Your task is to explain the query results in a way that's easy for non-technical users to understand.

    Input:
    - User's original question: {question}
    - SQL query used: {sql_query}
    - Query results (sample): {result_sample}

    Guidelines:
    1. Start with a direct answer to the user's question.
    2. Provide context by explaining what data was queried and how.
    3. Highlight key insights or patterns in the data.
    4. If only a sample is shown, mention this and avoid making absolute statements about the entire dataset.
    5. Use simple language and avoid technical jargon.
    6. If relevant, suggest potential follow-up questions or areas for further investigation.

    Output:
    - A clear, concise paragraph summarizing the results.
    - Ensure the summary is directly relevant to the original question.
    - If the results are unexpected or potentially erroneous, note this in your summary.

    Example:
    User Question: What are the top 3 genres by number of tracks?
    SQL Query: SELECT g.Name, COUNT(t.TrackId) AS TrackCount FROM Genre g JOIN Track t ON g.GenreId = t.GenreId GROUP BY g.GenreId, g.Name ORDER BY TrackCount DESC LIMIT 3;
    Results Sample:
    Name    TrackCount
    0  Rock    1297
    1  Latin   579
    2  Metal   374

    Summary:
    - The top 3 genres by number of tracks are Rock, Latin, and Metal.
    - Rock is the most represented genre with 1,297 tracks.
    - Latin has 579 tracks, and Metal has 374 tracks.
    - This data indicates a strong dominance of Rock music in the database.
    "#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_prompt_lists_all_tables() {
        let prompt = generation_prompt();
        for table in ["Artist:", "Album:", "Track:", "Customer:", "Invoice:"] {
            assert!(prompt.contains(table), "missing {}", table);
        }
        assert!(prompt.contains("executable in PostgreSQL"));
        assert!(prompt.contains("Do NOT use backticks"));
    }

    #[test]
    fn test_summary_prompt_embeds_inputs() {
        let prompt = summary_prompt("How many tracks?", "SELECT COUNT(*) FROM Track", "  count\n0  3503");
        assert!(prompt.contains("- User's original question: How many tracks?"));
        assert!(prompt.contains("- SQL query used: SELECT COUNT(*) FROM Track"));
        assert!(prompt.contains("- Query results (sample):   count\n0  3503"));
    }
}
