//! MPS encoding of the relocation problem: one binary column `T<i>` per
//! candidate, a single equality row fixing the number of relocations.

use std::io::{self, Write};

use super::{Relocation, matching_size};

pub fn write_relocation_problem<W: Write>(
    writer: &mut W,
    relocations: &[Relocation],
) -> io::Result<()> {
    let number_of_assignments = matching_size(relocations);

    writeln!(writer, "NAME AlonsoMoraRelocation")?;
    writeln!(writer, "ROWS")?;
    writeln!(writer, " N R{:07}", 0)?;
    writeln!(writer, " E R{:07}", 1)?;

    writeln!(writer, "COLUMNS")?;
    writeln!(writer, " M0000001 'MARKER' 'INTORG'")?;

    for (index, relocation) in relocations.iter().enumerate() {
        writeln!(
            writer,
            " T{} R{:07} {:.6} R{:07} 1",
            index, 0, relocation.cost, 1
        )?;
    }

    writeln!(writer, " M0000002 'MARKER' 'INTEND'")?;
    writeln!(writer, "RHS")?;
    writeln!(writer, " RHS1 R{:07} {}", 1, number_of_assignments)?;

    writeln!(writer, "BOUNDS")?;

    for index in 0..relocations.len() {
        writeln!(writer, " UP BND1 T{} 1", index)?;
        writeln!(writer, " LO BND1 T{} 0", index)?;
    }

    writeln!(writer, "ENDATA")?;
    Ok(())
}
