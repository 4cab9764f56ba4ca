/*!

This is the long-form manual for `bayes_audit` and `bptool`.

## The model

A ballot-polling audit samples paper ballots at random and looks at the
votes on them. After some ballots have been sampled in each county, the
question is: how likely is each candidate to win a full hand recount?

For each county, the votes on the ballots not sampled yet are unknown. They
are simulated from a Dirichlet-multinomial posterior: each candidate receives
one extra pseudo-vote (a flat prior), the sample counts plus the pseudo-votes
are the shapes of independent Gamma draws, the normalized draws are vote
shares, and the unsampled ballots are split among candidates with a
multinomial draw using those shares. Adding the sample tally gives one
plausible final tally per county; summing the counties gives the contest
tally and its winner (ties go to the candidate listed first).

Repeating this many times, with a different seed each time, gives the
fraction of simulated recounts each candidate wins.

## Seeds

Seeds are arbitrary non-negative integers. Trial `i` uses
`seed + i * 314159265`. Within a trial, all the counties use the same seed,
unless `--independent-county-seeds` is passed: county `k` then uses
`trial_seed + k * 271828183`.

## Command line

### Single county

```bash
bptool win-probs 10000 60 50 30
```

where 10000 is the total number of votes cast in the county and `60 50 30`
the votes seen so far for each candidate.

### Multiple counties

```bash
bptool win-probs --path-to-csv test.csv
```

where `test.csv` is a file like:

```text
county name, total votes, Alice, Bob
1, 1000, 30, 15
2, 2000, 40, 50
```

with one header line, then one line per county. The column `total votes` is
required, `county name` is optional; all the other columns are candidates.
Column names are matched ignoring case and surrounding spaces.

The same layout can be read from the first sheet of an Excel workbook with
`--input-type xlsx`, or given as a JSON contest with `--config`:

```json
{
  "contestName": "Mayor",
  "candidates": ["Alice", "Bob"],
  "counties": [
    {"name": "1", "totalVotes": 1000, "sampleTally": [30, 15]},
    {"name": "2", "totalVotes": 2000, "sampleTally": [40, 50]}
  ],
  "auditSeed": "1",
  "numTrials": 10000
}
```

### Risk estimation

```bash
bptool risk 10000 400 --margin 5 --trials-per-sample 1000 --num-samples 50
```

estimates how often an audit of 400 ballots would fail to confirm the winner
of a 10000 votes election decided by a 5% margin. Use `--vote-shares 45
--vote-shares 35 --vote-shares 20` (percentages) instead of the margin for
more than two candidates.

### Escalation

```bash
bptool allocate --path-to-csv counties.csv --additional-sample-size 200
```

with columns `county name`, `total votes` and `sampled`, prints how many new
ballots to draw in each county.

*/
